//! HTML pages served by the payment endpoints

use handlebars::Handlebars;
use serde_json::{json, Value};
use tracing::debug;

use crate::commerce::Cart;
use crate::error::{AppError, AppResult};
use crate::payments::form::WsPayForm;
use crate::payments::types::Page;

const BASE: &str = include_str!("templates/base.hbs");

const TEMPLATES: [(&str, &str); 4] = [
    ("payment", include_str!("templates/payment.hbs")),
    ("failed", include_str!("templates/failed.hbs")),
    ("error", include_str!("templates/error.hbs")),
    ("cancel", include_str!("templates/cancel.hbs")),
];

/// Handlebars registry with the bundled page templates
pub struct Views {
    handlebars: Handlebars<'static>,
}

impl Views {
    pub fn new() -> AppResult<Self> {
        let mut handlebars = Handlebars::new();
        handlebars
            .register_partial("base", BASE)
            .map_err(template_error)?;

        for (name, source) in TEMPLATES {
            handlebars
                .register_template_string(name, source)
                .map_err(template_error)?;
            debug!(template = name, "Registered page template");
        }

        Ok(Self { handlebars })
    }

    /// Confirmation page with the cart summary and the gateway form
    pub fn payment(&self, cart: &Cart, form: &WsPayForm) -> AppResult<String> {
        let items: Vec<Value> = cart
            .items
            .iter()
            .map(|item| {
                json!({
                    "name": item.product_name,
                    "quantity": item.quantity,
                    "unit_price": money(item.unit_price),
                    "line_total": money(item.line_total()),
                })
            })
            .collect();
        let extra_rows: Vec<Value> = cart
            .extra_rows
            .values()
            .map(|row| json!({ "label": row.label, "amount": money(row.amount) }))
            .collect();

        let context = json!({
            "items": items,
            "extra_rows": extra_rows,
            "subtotal": money(cart.subtotal),
            "total": money(cart.total),
            "currency": cart.currency,
            "form": form,
            "message": Value::Null,
        });
        Ok(self.handlebars.render("payment", &context)?)
    }

    /// Failure, error or cancel page with an optional flash message
    pub fn page(&self, page: Page, message: Option<&str>) -> AppResult<String> {
        let name = match page {
            Page::Failed => "failed",
            Page::Error => "error",
            Page::Cancel => "cancel",
        };
        Ok(self.handlebars.render(name, &json!({ "message": message }))?)
    }
}

fn money(amount: rust_decimal::Decimal) -> String {
    format!("{:.2}", amount)
}

fn template_error(err: handlebars::TemplateError) -> AppError {
    AppError::Template {
        message: err.to_string(),
    }
}
