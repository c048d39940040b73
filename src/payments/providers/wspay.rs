//! WSPay payment provider implementation
//!
//! WSPay is a hosted payment form: the shop posts a signed form to the
//! gateway's authorization page and the gateway redirects the customer back
//! to the return, error or cancel URL. Only the return callback carries a
//! signature, and it is the only one that can turn a cart into an order.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::commerce::countries::country_name;
use crate::commerce::{Cart, CommerceStore, Order};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::payments::form::{WsPayForm, WsPayFormData};
use crate::payments::modifier::WsPayModifier;
use crate::payments::signature;
use crate::payments::traits::PaymentProvider;
use crate::payments::types::{
    CallbackOutcome, CallbackPayload, Page, PaymentChoice, PaymentRequest, PaymentView,
    TotalAmount, TransactionRequest,
};
use crate::payments::workflow::CallbackState;
use crate::payments::PAYMENT_NAMESPACE;

const DEFAULT_LANG: &str = "HR";

/// WSPay payment provider
pub struct WsPayProvider {
    config: Arc<Config>,
    store: Arc<dyn CommerceStore>,
    modifier: WsPayModifier,
}

impl WsPayProvider {
    pub fn new(config: Arc<Config>, store: Arc<dyn CommerceStore>) -> Self {
        let modifier = WsPayModifier::new(
            config.wspay.commission_percentage,
            config.wspay.modifier_choice_text.clone(),
        );
        Self {
            config,
            store,
            modifier,
        }
    }

    /// Absolute URL of one of this provider's endpoints.
    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.server.public_url, PAYMENT_NAMESPACE, path
        )
    }

    fn ensure_currency(&self, currency: &str) -> AppResult<()> {
        let expected = &self.config.wspay.currency;
        if currency != expected {
            error!(
                "Currency needs to be {}, cart or order is in {}",
                expected, currency
            );
            return Err(AppError::currency_mismatch(expected.clone(), currency));
        }
        Ok(())
    }

    async fn priced_cart(&self, cart_id: i64) -> AppResult<Cart> {
        let mut cart = self
            .store
            .find_cart(cart_id)
            .await?
            .ok_or_else(|| AppError::not_found("Cart", cart_id))?;
        self.modifier.update_cart(&mut cart);
        Ok(cart)
    }

    fn choice_for(&self, cart: &Cart) -> PaymentChoice {
        let (identifier, label) = self.modifier.choice();
        PaymentChoice {
            identifier: identifier.to_string(),
            label: label.to_string(),
            disabled: self.modifier.is_disabled(cart),
            selected: self.modifier.is_active(cart),
        }
    }

    /// Load the cart with the modifier applied, if it can be paid with WSPay.
    async fn payable_cart(&self, cart_id: i64) -> AppResult<Option<Cart>> {
        let Some(mut cart) = self.store.find_cart(cart_id).await? else {
            return Ok(None);
        };
        self.modifier.update_cart(&mut cart);

        if !self.modifier.is_active(&cart) || cart.total <= Decimal::ZERO {
            return Ok(None);
        }
        Ok(Some(cart))
    }

    /// Fields signed into the outbound request for this cart.
    pub fn transaction_request(&self, cart: &Cart) -> AppResult<TransactionRequest> {
        self.ensure_currency(&cart.currency)?;
        Ok(TransactionRequest {
            shop_id: self.config.wspay.shop_id.clone(),
            shopping_cart_id: cart.id.to_string(),
            total_amount: TotalAmount::from_decimal(cart.total)?,
        })
    }

    /// Signed form for the cart, ready to post or render.
    pub fn build_form(&self, cart: &Cart, locale: &str) -> AppResult<WsPayForm> {
        let request = self.transaction_request(cart)?;
        let signature = signature::sign_request(
            &request.shop_id,
            self.config.wspay.secret_key(),
            &request.shopping_cart_id,
            &request.total_amount,
        );

        let mut data = WsPayFormData {
            shop_id: request.shop_id,
            shopping_cart_id: request.shopping_cart_id,
            total_amount: request.total_amount.display(),
            signature,
            return_url: self.url("return/"),
            cancel_url: self.url("cancel/"),
            return_error_url: self.url("error/"),
            lang: gateway_lang(locale),
            customer_email: cart.customer.email.clone(),
            customer_phone: cart.customer.phone_number.clone(),
            ..Default::default()
        };

        if let Some(address) = &cart.billing_address {
            let (first_name, last_name) = address.split_name();
            data.customer_first_name = first_name;
            data.customer_last_name = last_name;
            data.customer_address = address.address1.clone();
            data.customer_city = address.city.clone();
            data.customer_zip = address.zip_code.clone();
            data.customer_country = country_name(&address.country).to_string();
        } else {
            warn!(cart_id = cart.id, "Cart has no billing address");
        }

        Ok(WsPayForm::new(self.config.wspay.form_url.clone(), data))
    }

    async fn settle_paid_cart(
        &self,
        mut cart: Cart,
        payload: &CallbackPayload,
    ) -> AppResult<CallbackOutcome> {
        self.modifier.update_cart(&mut cart);

        let mut order = Order::from_cart(&cart);
        order.add_wspay_payment(
            &payload.approval_code,
            payload.amount_paid,
            &self.config.wspay.currency,
        )?;
        order
            .extra
            .insert("transaction_id".to_string(), payload.approval_code.clone());

        let order = self.store.checkout(&cart, &order).await?;
        info!(
            "WSPay payment accepted: order_id={}, cart_id={}, amount={}",
            order.id, cart.id, payload.amount_paid
        );

        let location = match &self.config.wspay.thank_you_url {
            Some(url) => url.clone(),
            None => format!("{}/{}", self.config.wspay.order_url, order.id),
        };
        Ok(CallbackOutcome::Redirect {
            location,
            message: self.config.wspay.success_message.clone(),
        })
    }

    async fn abandon_cart(
        &self,
        cart_id: Option<i64>,
        page: Page,
        message: Option<String>,
    ) -> AppResult<CallbackOutcome> {
        if let Some(cart_id) = cart_id {
            if !self.store.empty_cart(cart_id).await? {
                warn!(cart_id, "Gateway referenced a cart that does not exist");
            }
        }
        Ok(CallbackOutcome::Render { page, message })
    }
}

/// Two-letter upper-case gateway language from a locale such as `hr-HR`.
fn gateway_lang(locale: &str) -> String {
    let lang: String = locale.chars().take(2).collect();
    if lang.len() == 2 && lang.chars().all(|c| c.is_ascii_alphabetic()) {
        lang.to_ascii_uppercase()
    } else {
        DEFAULT_LANG.to_string()
    }
}

#[async_trait]
impl PaymentProvider for WsPayProvider {
    fn namespace(&self) -> &'static str {
        PAYMENT_NAMESPACE
    }

    async fn payment_choice(&self, cart_id: i64) -> AppResult<PaymentChoice> {
        let cart = self.priced_cart(cart_id).await?;
        Ok(self.choice_for(&cart))
    }

    async fn select_payment(&self, cart_id: i64) -> AppResult<PaymentChoice> {
        let mut cart = self.priced_cart(cart_id).await?;
        if self.modifier.is_disabled(&cart) {
            return Err(AppError::payment_unavailable(format!(
                "Cart with id {} has nothing to pay",
                cart_id
            )));
        }

        cart.payment_modifier = Some(self.modifier.identifier().to_string());
        self.modifier.update_cart(&mut cart);
        self.store.save_cart(&cart).await?;
        info!(cart_id, total = %cart.total, "WSPay selected as payment method");
        Ok(self.choice_for(&cart))
    }

    async fn payment_request(&self, cart_id: i64, locale: &str) -> AppResult<PaymentRequest> {
        if self.config.wspay.payment_view {
            return Ok(PaymentRequest::Script(format!(
                "window.location.href=\"{}?cart={}\";",
                self.url(""),
                cart_id
            )));
        }

        match self.payable_cart(cart_id).await? {
            Some(cart) => {
                info!(
                    "Initiating WSPay payment: cart_id={}, total={} {}",
                    cart.id, cart.total, cart.currency
                );
                let form = self.build_form(&cart, locale)?;
                Ok(PaymentRequest::Script(form.to_js_expression()))
            }
            None => Ok(PaymentRequest::Redirect(self.config.wspay.cart_url.clone())),
        }
    }

    async fn payment_view(&self, cart_id: Option<i64>, locale: &str) -> AppResult<PaymentView> {
        let cart_url = self.config.wspay.cart_url.clone();
        if !self.config.wspay.payment_view {
            return Ok(PaymentView::Redirect(cart_url));
        }
        let Some(cart_id) = cart_id else {
            return Ok(PaymentView::Redirect(cart_url));
        };

        match self.payable_cart(cart_id).await? {
            Some(cart) => {
                let form = self.build_form(&cart, locale)?;
                Ok(PaymentView::Render { cart, form })
            }
            None => Ok(PaymentView::Redirect(cart_url)),
        }
    }

    async fn handle_return(&self, query: &HashMap<String, String>) -> AppResult<CallbackOutcome> {
        let payload = match CallbackPayload::from_query(query) {
            Ok(payload) => payload,
            Err(_) => {
                return Ok(CallbackOutcome::Redirect {
                    location: self.config.wspay.cart_url.clone(),
                    message: None,
                })
            }
        };

        let Some(cart) = self.store.find_cart(payload.shopping_cart_id).await? else {
            let message = format!("Cart with id {} doesn't exist", payload.shopping_cart_id);
            error!("{}", message);
            return Err(AppError::suspicious_operation(message));
        };

        info!(
            "WSPay response: {}; ShoppingCartID: {}; ApprovalCode: {}; Signature: {}",
            payload.success, payload.shopping_cart_id, payload.approval_code, payload.signature
        );

        let verdict = CallbackState::Pending.verify(
            &payload,
            &self.config.wspay.shop_id,
            self.config.wspay.secret_key(),
        )?;

        match verdict {
            CallbackState::VerifiedSuccess => self.settle_paid_cart(cart, &payload).await,
            _ => {
                warn!(
                    cart_id = cart.id,
                    success = payload.success,
                    "WSPay transaction not verified, emptying cart"
                );
                self.store.empty_cart(cart.id).await?;
                Ok(CallbackOutcome::Render {
                    page: Page::Failed,
                    message: None,
                })
            }
        }
    }

    async fn handle_error(&self, cart_id: Option<i64>) -> AppResult<CallbackOutcome> {
        warn!(?cart_id, "WSPay reported a transaction error");
        self.abandon_cart(cart_id, Page::Error, self.config.wspay.error_message.clone())
            .await
    }

    async fn handle_cancel(&self, cart_id: Option<i64>) -> AppResult<CallbackOutcome> {
        info!(?cart_id, "WSPay transaction cancelled by customer");
        self.abandon_cart(cart_id, Page::Cancel, self.config.wspay.cancel_message.clone())
            .await
    }

    async fn acknowledge_payment(&self, order_id: Uuid) -> AppResult<Order> {
        let mut order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or_else(|| AppError::not_found("Order", order_id))?;

        order.acknowledge_wspay_payment()?;
        self.store.update_order_status(&order).await?;
        info!(order_id = %order.id, "WSPay payment acknowledged");
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commerce::{BillingAddress, CartItem, Customer, MemoryStore};
    use crate::payments::workflow::OrderStatus;

    fn config(extra: &[(&str, &str)]) -> Arc<Config> {
        let mut vars: HashMap<String, String> = [
            ("PORT", "3030"),
            ("PUBLIC_URL", "https://shop.example.com"),
            ("WSPAY_SHOP_ID", "1000000"),
            ("WSPAY_SECRET_KEY", "secret"),
            ("WSPAY_FORM_URL", "https://formtest.wspay.biz/Authorization.aspx"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in extra {
            vars.insert(k.to_string(), v.to_string());
        }
        Arc::new(Config::from_lookup(|key| vars.get(key).cloned()).unwrap())
    }

    fn cart(id: i64, price: Decimal) -> Cart {
        let mut cart = Cart::new(
            id,
            Customer {
                email: "ana@example.com".to_string(),
                phone_number: "+385911234567".to_string(),
            },
            "EUR",
        );
        cart.billing_address = Some(BillingAddress {
            name: "Ana Marija Horvat".to_string(),
            address1: "Ilica 1".to_string(),
            city: "Zagreb".to_string(),
            zip_code: "10000".to_string(),
            country: "HR".to_string(),
        });
        cart.items.push(CartItem {
            product_code: "MUG".to_string(),
            product_name: "Mug".to_string(),
            quantity: 1,
            unit_price: price,
        });
        cart.payment_modifier = Some("wspay".to_string());
        cart.recalculate();
        cart
    }

    async fn provider(extra: &[(&str, &str)], carts: Vec<Cart>) -> (WsPayProvider, MemoryStore) {
        let store = MemoryStore::new();
        for cart in carts {
            store.insert_cart(cart).await;
        }
        let provider = WsPayProvider::new(config(extra), Arc::new(store.clone()));
        (provider, store)
    }

    fn return_query(cart_id: i64, success: i64, approval_code: &str, signature: &str) -> HashMap<String, String> {
        [
            ("ShoppingCartID", cart_id.to_string()),
            ("Success", success.to_string()),
            ("ApprovalCode", approval_code.to_string()),
            ("Signature", signature.to_string()),
            ("Amount", "10,00".to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    #[test]
    fn test_gateway_lang() {
        assert_eq!(gateway_lang("hr-HR"), "HR");
        assert_eq!(gateway_lang("en"), "EN");
        assert_eq!(gateway_lang(""), "HR");
        assert_eq!(gateway_lang("*"), "HR");
    }

    #[tokio::test]
    async fn test_build_form() {
        let (provider, _) = provider(&[], vec![]).await;
        let form = provider
            .build_form(&cart(42, Decimal::new(1000, 2)), "en-US")
            .unwrap();

        assert_eq!(form.action, "https://formtest.wspay.biz/Authorization.aspx");
        assert_eq!(form.value("ShopID"), Some("1000000"));
        assert_eq!(form.value("ShoppingCartID"), Some("42"));
        assert_eq!(form.value("TotalAmount"), Some("10,00"));
        assert_eq!(
            form.value("Signature"),
            Some("c9fd9a7475836088a67ebabcbf785906")
        );
        assert_eq!(
            form.value("ReturnURL"),
            Some("https://shop.example.com/wspay/return/")
        );
        assert_eq!(
            form.value("CancelURL"),
            Some("https://shop.example.com/wspay/cancel/")
        );
        assert_eq!(
            form.value("ReturnErrorURL"),
            Some("https://shop.example.com/wspay/error/")
        );
        assert_eq!(form.value("Lang"), Some("EN"));
        assert_eq!(form.value("CustomerFirstName"), Some("Ana"));
        assert_eq!(form.value("CustomerLastName"), Some("Marija Horvat"));
        assert_eq!(form.value("CustomerCountry"), Some("Croatia"));
        assert_eq!(form.value("CustomerPhone"), Some("+385911234567"));
    }

    #[tokio::test]
    async fn test_build_form_rejects_other_currency() {
        let (provider, _) = provider(&[], vec![]).await;
        let mut cart = cart(42, Decimal::new(1000, 2));
        cart.currency = "USD".to_string();
        assert!(matches!(
            provider.build_form(&cart, "hr"),
            Err(AppError::CurrencyMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_payment_request_script() {
        let (provider, _) = provider(&[], vec![cart(42, Decimal::new(1000, 2))]).await;
        match provider.payment_request(42, "hr").await.unwrap() {
            PaymentRequest::Script(js) => {
                assert!(js.contains("Signature.setAttribute('value', 'c9fd9a7475836088a67ebabcbf785906');"))
            }
            other => panic!("expected script, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_payment_request_redirects_ineligible_carts() {
        let mut other_choice = cart(1, Decimal::new(1000, 2));
        other_choice.payment_modifier = Some("cash".to_string());
        let free = cart(2, Decimal::ZERO);
        let (provider, _) = provider(&[], vec![other_choice, free]).await;

        for cart_id in [1, 2, 3] {
            assert_eq!(
                provider.payment_request(cart_id, "hr").await.unwrap(),
                PaymentRequest::Redirect("/shop/cart/".to_string())
            );
        }
    }

    #[tokio::test]
    async fn test_payment_request_with_payment_view() {
        let (provider, _) = provider(&[("WSPAY_PAYMENT_VIEW", "true")], vec![]).await;
        assert_eq!(
            provider.payment_request(42, "hr").await.unwrap(),
            PaymentRequest::Script(
                "window.location.href=\"https://shop.example.com/wspay/?cart=42\";".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_payment_view_disabled_redirects() {
        let (provider, _) = provider(&[], vec![cart(42, Decimal::new(1000, 2))]).await;
        assert!(matches!(
            provider.payment_view(Some(42), "hr").await.unwrap(),
            PaymentView::Redirect(_)
        ));
    }

    #[tokio::test]
    async fn test_payment_view_includes_commission() {
        let (provider, _) = provider(
            &[
                ("WSPAY_PAYMENT_VIEW", "1"),
                ("WSPAY_COMMISSION_PERCENTAGE", "10"),
            ],
            vec![cart(42, Decimal::new(1000, 2))],
        )
        .await;

        match provider.payment_view(Some(42), "hr").await.unwrap() {
            PaymentView::Render { cart, form } => {
                assert_eq!(cart.total, Decimal::new(1100, 2));
                assert_eq!(form.value("TotalAmount"), Some("11,00"));
                // md5("1000000secret42secret1100secret")
                assert_eq!(
                    form.value("Signature"),
                    Some("06a57ea1ba7bac4b5836dab33a7521fe")
                );
            }
            other => panic!("expected render, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_successful_return_creates_order() {
        let (provider, store) = provider(
            &[("WSPAY_SUCCESS_MESSAGE", "Thank you!")],
            vec![cart(42, Decimal::new(1000, 2))],
        )
        .await;
        let signature = signature::callback_signature("1000000", "secret", 42, 1, "AB12");

        let outcome = provider
            .handle_return(&return_query(42, 1, "AB12", &signature))
            .await
            .unwrap();

        let orders = store.orders().await;
        assert_eq!(orders.len(), 1);
        let order = &orders[0];
        assert_eq!(order.status, OrderStatus::PaidWithWsPay);
        assert_eq!(order.extra.get("transaction_id").map(String::as_str), Some("AB12"));
        assert_eq!(order.payments[0].amount, Decimal::new(1000, 2));
        assert!(store.find_cart(42).await.unwrap().is_none());
        assert_eq!(
            outcome,
            CallbackOutcome::Redirect {
                location: format!("/shop/orders/{}", order.id),
                message: Some("Thank you!".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_successful_return_uses_thank_you_url() {
        let (provider, _) = provider(
            &[("WSPAY_THANK_YOU_URL", "/thanks/")],
            vec![cart(42, Decimal::new(1000, 2))],
        )
        .await;
        let signature = signature::callback_signature("1000000", "secret", 42, 1, "AB12");

        let outcome = provider
            .handle_return(&return_query(42, 1, "AB12", &signature))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            CallbackOutcome::Redirect {
                location: "/thanks/".to_string(),
                message: None,
            }
        );
    }

    #[tokio::test]
    async fn test_forged_return_empties_cart() {
        let (provider, store) = provider(&[], vec![cart(42, Decimal::new(1000, 2))]).await;

        let outcome = provider
            .handle_return(&return_query(42, 1, "AB12", &"0".repeat(32)))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            CallbackOutcome::Render {
                page: Page::Failed,
                message: None,
            }
        );
        assert!(store.orders().await.is_empty());
        assert!(store.find_cart(42).await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsuccessful_return_with_valid_signature_fails() {
        let (provider, store) = provider(&[], vec![cart(42, Decimal::new(1000, 2))]).await;
        let signature = signature::callback_signature("1000000", "secret", 42, 1, "");

        let outcome = provider
            .handle_return(&return_query(42, 1, "", &signature))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            CallbackOutcome::Render {
                page: Page::Failed,
                ..
            }
        ));
        assert!(store.orders().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_return_redirects_to_cart() {
        let (provider, store) = provider(&[], vec![cart(42, Decimal::new(1000, 2))]).await;
        let mut query = return_query(42, 1, "AB12", "abc");
        query.remove("Signature");

        let outcome = provider.handle_return(&query).await.unwrap();
        assert_eq!(
            outcome,
            CallbackOutcome::Redirect {
                location: "/shop/cart/".to_string(),
                message: None,
            }
        );
        assert!(!store.find_cart(42).await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_cart_is_suspicious() {
        let (provider, _) = provider(&[], vec![]).await;
        let signature = signature::callback_signature("1000000", "secret", 99, 1, "AB12");

        let result = provider
            .handle_return(&return_query(99, 1, "AB12", &signature))
            .await;
        assert!(matches!(result, Err(AppError::SuspiciousOperation { .. })));
    }

    #[tokio::test]
    async fn test_cancel_empties_cart() {
        let (provider, store) = provider(
            &[("WSPAY_CANCEL_MESSAGE", "Payment cancelled")],
            vec![cart(42, Decimal::new(1000, 2))],
        )
        .await;

        let outcome = provider.handle_cancel(Some(42)).await.unwrap();
        assert_eq!(
            outcome,
            CallbackOutcome::Render {
                page: Page::Cancel,
                message: Some("Payment cancelled".to_string()),
            }
        );
        assert!(store.find_cart(42).await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_error_without_cart_still_renders() {
        let (provider, _) = provider(&[], vec![]).await;
        let outcome = provider.handle_error(None).await.unwrap();
        assert_eq!(
            outcome,
            CallbackOutcome::Render {
                page: Page::Error,
                message: None,
            }
        );
    }

    #[tokio::test]
    async fn test_acknowledge_paid_order() {
        let (provider, store) = provider(&[], vec![cart(42, Decimal::new(1000, 2))]).await;
        let signature = signature::callback_signature("1000000", "secret", 42, 1, "AB12");
        provider
            .handle_return(&return_query(42, 1, "AB12", &signature))
            .await
            .unwrap();
        let order_id = store.orders().await[0].id;

        let order = provider.acknowledge_payment(order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::PaymentConfirmed);

        let again = provider.acknowledge_payment(order_id).await;
        assert!(matches!(again, Err(AppError::Transition(_))));

        let missing = provider.acknowledge_payment(Uuid::new_v4()).await;
        assert!(matches!(missing, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_select_payment_saves_cart() {
        let mut unselected = cart(42, Decimal::new(1000, 2));
        unselected.payment_modifier = None;
        let (provider, store) = provider(
            &[("WSPAY_COMMISSION_PERCENTAGE", "10")],
            vec![unselected],
        )
        .await;

        let choice = provider.payment_choice(42).await.unwrap();
        assert_eq!(choice.identifier, "wspay");
        assert_eq!(choice.label, "WSPay");
        assert!(!choice.disabled);
        assert!(!choice.selected);

        let choice = provider.select_payment(42).await.unwrap();
        assert!(choice.selected);

        let saved = store.find_cart(42).await.unwrap().unwrap();
        assert_eq!(saved.payment_modifier.as_deref(), Some("wspay"));
        assert_eq!(saved.total, Decimal::new(1100, 2));
        assert!(matches!(
            provider.payment_request(42, "hr").await.unwrap(),
            PaymentRequest::Script(_)
        ));
    }

    #[tokio::test]
    async fn test_select_payment_rejects_empty_cart() {
        let mut empty = cart(42, Decimal::new(1000, 2));
        empty.payment_modifier = None;
        empty.empty();
        let (provider, store) = provider(&[], vec![empty]).await;

        assert!(provider.payment_choice(42).await.unwrap().disabled);
        let result = provider.select_payment(42).await;
        assert!(matches!(result, Err(AppError::PaymentUnavailable { .. })));
        let stored = store.find_cart(42).await.unwrap().unwrap();
        assert_eq!(stored.payment_modifier, None);

        let missing = provider.payment_choice(7).await;
        assert!(matches!(missing, Err(AppError::NotFound { .. })));
    }
}
