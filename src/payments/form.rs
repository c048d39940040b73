//! Hidden-field form posted to the WSPay authorization page

use serde::Serialize;

/// Form field names in the order the gateway receives them.
pub const FIELD_NAMES: [&str; 16] = [
    "ShopID",
    "ShoppingCartID",
    "TotalAmount",
    "Signature",
    "ReturnURL",
    "CancelURL",
    "ReturnErrorURL",
    "Lang",
    "CustomerFirstName",
    "CustomerLastName",
    "CustomerAddress",
    "CustomerCity",
    "CustomerZIP",
    "CustomerCountry",
    "CustomerEmail",
    "CustomerPhone",
];

#[derive(Debug, Clone, Default)]
pub struct WsPayFormData {
    pub shop_id: String,
    pub shopping_cart_id: String,
    pub total_amount: String,
    pub signature: String,
    pub return_url: String,
    pub cancel_url: String,
    pub return_error_url: String,
    pub lang: String,
    pub customer_first_name: String,
    pub customer_last_name: String,
    pub customer_address: String,
    pub customer_city: String,
    pub customer_zip: String,
    pub customer_country: String,
    pub customer_email: String,
    pub customer_phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormField {
    pub name: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WsPayForm {
    pub action: String,
    pub fields: Vec<FormField>,
}

impl WsPayForm {
    pub fn new(action: impl Into<String>, data: WsPayFormData) -> Self {
        let values = [
            data.shop_id,
            data.shopping_cart_id,
            data.total_amount,
            data.signature,
            data.return_url,
            data.cancel_url,
            data.return_error_url,
            data.lang,
            data.customer_first_name,
            data.customer_last_name,
            data.customer_address,
            data.customer_city,
            data.customer_zip,
            data.customer_country,
            data.customer_email,
            data.customer_phone,
        ];
        let fields = FIELD_NAMES
            .into_iter()
            .zip(values)
            .map(|(name, value)| FormField { name, value })
            .collect();

        Self {
            action: action.into(),
            fields,
        }
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// One-line script that builds this form in the page and submits it.
    pub fn to_js_expression(&self) -> String {
        let js_fields: String = self
            .fields
            .iter()
            .map(|field| {
                format!(
                    "var {name} = document.createElement('input');\
                     {name}.setAttribute('type', 'hidden');\
                     {name}.setAttribute('name', '{name}');\
                     {name}.setAttribute('value', '{value}');\
                     form.appendChild({name});",
                    name = field.name,
                    value = escape_js(&field.value),
                )
            })
            .collect();

        format!(
            "(function () {{\
             var form = document.createElement('form');\
             form.setAttribute('action', '{action}');\
             form.setAttribute('method', 'POST');\
             {js_fields}\
             document.body.appendChild(form);\
             form.submit();\
             }})();",
            action = escape_js(&self.action),
            js_fields = js_fields,
        )
    }
}

/// Escape a value for a single-quoted JavaScript string inside an HTML page.
fn escape_js(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '<' => escaped.push_str("\\u003C"),
            '>' => escaped.push_str("\\u003E"),
            '&' => escaped.push_str("\\u0026"),
            '\u{2028}' => escaped.push_str("\\u2028"),
            '\u{2029}' => escaped.push_str("\\u2029"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> WsPayForm {
        WsPayForm::new(
            "https://formtest.wspay.biz/Authorization.aspx",
            WsPayFormData {
                shop_id: "MYSHOP".to_string(),
                shopping_cart_id: "42".to_string(),
                total_amount: "10,00".to_string(),
                signature: "c9fd9a7475836088a67ebabcbf785906".to_string(),
                customer_last_name: "O'Brien".to_string(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_fields_keep_gateway_order() {
        let form = form();
        let names: Vec<&str> = form.fields.iter().map(|f| f.name).collect();
        assert_eq!(names, FIELD_NAMES.to_vec());
        assert_eq!(form.value("TotalAmount"), Some("10,00"));
        assert_eq!(form.value("Unknown"), None);
    }

    #[test]
    fn test_js_expression_posts_every_field() {
        let js = form().to_js_expression();
        assert!(js.starts_with("(function () {var form = document.createElement('form');"));
        assert!(js.contains(
            "form.setAttribute('action', 'https://formtest.wspay.biz/Authorization.aspx');"
        ));
        assert!(js.contains("form.setAttribute('method', 'POST');"));
        assert!(js.contains("ShoppingCartID.setAttribute('value', '42');"));
        assert!(js.ends_with("document.body.appendChild(form);form.submit();})();"));
        assert!(!js.contains('\n'));
        for name in FIELD_NAMES {
            assert!(js.contains(&format!("form.appendChild({});", name)));
        }
    }

    #[test]
    fn test_js_values_are_escaped() {
        let js = form().to_js_expression();
        assert!(js.contains("CustomerLastName.setAttribute('value', 'O\\'Brien');"));
        assert_eq!(escape_js("</script>"), "\\u003C/script\\u003E");
    }
}
