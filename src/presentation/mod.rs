//! HTML fragments shown to shoppers, administrators and email recipients.
//!
//! Every renderer is pure: it reads the order's frozen identifier pair and the
//! values passed in, never live settings, and escapes all dynamic text.

use crate::config::GatewayConfig;
use crate::models::{IdentifierPair, Order};

/// Container the checkout script fills once a reservation is created.
pub const PAYMENT_INFO_CONTAINER_ID: &str = "cvu_payment_info";

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn pair_lines(pair: &IdentifierPair) -> String {
    format!(
        "<strong>CVU:</strong> {}<br><strong>Alias:</strong> {}",
        escape_html(&pair.cvu),
        escape_html(&pair.alias)
    )
}

fn days_phrase(days: i64) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", days)
    }
}

/// Checkout panel for the payment method.
pub fn payment_fields(config: &GatewayConfig) -> String {
    let mut html = String::new();
    if !config.description.trim().is_empty() {
        html.push_str(&format!("<p>{}</p>", escape_html(config.description.trim())));
    }

    if config.use_api {
        html.push_str(
            "<p>Selecting this method generates a CVU/Alias for your transfer. \
             It will be shown here and emailed to you when you place the order.</p>",
        );
        html.push_str(&format!("<div id=\"{}\"></div>", PAYMENT_INFO_CONTAINER_ID));
    } else {
        match config.backup_pair() {
            Some(pair) => {
                html.push_str(&format!(
                    "<p>{}<br>Using the store's backup CVU/Alias.</p>",
                    pair_lines(&pair)
                ));
            }
            None => html.push_str(
                "<p class=\"error\">No backup CVU/Alias found. Please check the payment settings.</p>",
            ),
        }
    }
    html
}

/// Order-received page block. Empty for other payment methods or orders without a pair.
pub fn thank_you(order: &Order, days: i64) -> String {
    if !order.uses_gateway() {
        return String::new();
    }
    let Some(pair) = order.identifier_pair() else {
        return String::new();
    };

    format!(
        "<h2>Payment instructions</h2><p>{}</p><p>You have {} to complete the payment. \
         This information was also sent to your email.</p>",
        pair_lines(pair),
        days_phrase(days)
    )
}

/// Block appended to the platform's customer emails.
pub fn email_instructions(order: &Order, days: i64, sent_to_admin: bool) -> String {
    if sent_to_admin || !order.uses_gateway() {
        return String::new();
    }
    let Some(pair) = order.identifier_pair() else {
        return String::new();
    };

    format!(
        "\n<h2>Details to complete your payment</h2>\n<p>{}<br>You have {} to complete the payment. \
         Thank you for your purchase.</p>",
        pair_lines(pair),
        days_phrase(days)
    )
}

/// Tracks whether the admin panel was already emitted in the current render pass.
#[derive(Debug, Default)]
pub struct AdminRenderState {
    rendered: bool,
}

impl AdminRenderState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rendered(&self) -> bool {
        self.rendered
    }
}

/// Admin order panel. Rendered at most once per [`AdminRenderState`].
pub fn admin_panel(
    order: &Order,
    days: i64,
    show_days: bool,
    state: &mut AdminRenderState,
) -> String {
    if !order.uses_gateway() || state.rendered {
        return String::new();
    }
    state.rendered = true;

    let Some(pair) = order.identifier_pair() else {
        return String::new();
    };

    let mut html = String::from("<div class=\"cvu-payment-details\"><h3>CVU/Alias payment details</h3>");
    html.push_str(&format!("<p>{}</p>", pair_lines(pair)));
    if show_days {
        html.push_str(&format!(
            "<p><strong>Days remaining:</strong> {}</p>",
            days.max(0)
        ));
    }
    html.push_str(&format!(
        "<form method=\"post\" action=\"/api/v1/admin/orders/{}/reminder\">\
         <button type=\"submit\" class=\"button\">Send reminder email</button></form></div>",
        order.id
    ));
    html
}

/// Which reminder email to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderKind {
    /// Sent when the order enters on-hold
    PaymentInstructions,
    /// Triggered by an administrator
    Reminder,
}

/// Subject and HTML body for a reminder email.
pub fn reminder_email(
    kind: ReminderKind,
    store_name: &str,
    days: i64,
    pair: &IdentifierPair,
) -> (String, String) {
    let store = escape_html(store_name);
    let (subject, mut body) = match kind {
        ReminderKind::PaymentInstructions => (
            "Payment details for your order",
            format!(
                "<h2>Your order at {} is awaiting payment</h2>\
                 <p>A CVU/Alias has been assigned. You have {} to complete the transfer.</p>",
                store,
                days_phrase(days)
            ),
        ),
        ReminderKind::Reminder => (
            "Pending payment reminder",
            format!(
                "<h2>Payment reminder</h2>\
                 <p>{} left to complete the payment of your order at {}.</p>",
                days_phrase(days),
                store
            ),
        ),
    };

    body.push_str(&format!("<p>{}</p>", pair_lines(pair)));
    body.push_str(
        "<p>Make the transfer before the time runs out. Once it is confirmed we will process your order.</p>\
         <p>Thank you for choosing us.</p>",
    );
    (subject.to_string(), body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IdentifierAssignment, NewOrder, OrderId, GATEWAY_ID};
    use chrono::Utc;

    fn gateway_order(cvu: &str, alias: &str) -> Order {
        let mut order = NewOrder::pending(Vec::new(), Utc::now()).into_order(OrderId(42));
        order.payment_method = Some(GATEWAY_ID.to_string());
        order.identifier = Some(IdentifierAssignment::api(IdentifierPair::new(cvu, alias)));
        order
    }

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html(r#"<b>"x" & 'y'</b>"#),
            "&lt;b&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn thank_you_escapes_alias() {
        let order = gateway_order("000123", "<script>alert(1)</script>");
        let html = thank_you(&order, 7);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("7 days"));
    }

    #[test]
    fn thank_you_is_empty_for_other_methods() {
        let mut order = gateway_order("000123", "alias");
        order.payment_method = Some("card".into());
        assert!(thank_you(&order, 7).is_empty());
    }

    #[test]
    fn email_block_skipped_for_admin_copy() {
        let order = gateway_order("000123", "alias");
        assert!(email_instructions(&order, 3, true).is_empty());
        assert!(email_instructions(&order, 3, false).contains("000123"));
    }

    #[test]
    fn admin_panel_renders_once_per_pass() {
        let order = gateway_order("000123", "alias");
        let mut state = AdminRenderState::new();

        let first = admin_panel(&order, 5, true, &mut state);
        assert!(first.contains("Days remaining:</strong> 5"));
        assert!(first.contains("/api/v1/admin/orders/42/reminder"));
        assert!(state.rendered());

        assert!(admin_panel(&order, 5, true, &mut state).is_empty());
        assert!(!admin_panel(&order, 5, true, &mut AdminRenderState::new()).is_empty());
    }

    #[test]
    fn admin_panel_hides_days_when_disabled() {
        let order = gateway_order("000123", "alias");
        let html = admin_panel(&order, 5, false, &mut AdminRenderState::new());
        assert!(!html.contains("Days remaining"));
    }

    #[test]
    fn backup_mode_panel_shows_pair_or_error() {
        let mut config = GatewayConfig {
            use_api: false,
            backup_cvu: "999".into(),
            backup_alias: "respaldo".into(),
            ..GatewayConfig::default()
        };
        assert!(payment_fields(&config).contains("respaldo"));

        config.backup_alias.clear();
        assert!(payment_fields(&config).contains("class=\"error\""));

        config.use_api = true;
        assert!(payment_fields(&config).contains(PAYMENT_INFO_CONTAINER_ID));
    }

    #[test]
    fn reminder_subjects_follow_kind() {
        let pair = IdentifierPair::new("000123", "alias");
        let (subject, body) = reminder_email(ReminderKind::PaymentInstructions, "Tienda & Co", 1, &pair);
        assert_eq!(subject, "Payment details for your order");
        assert!(body.contains("Tienda &amp; Co"));
        assert!(body.contains("1 day "));

        let (subject, _) = reminder_email(ReminderKind::Reminder, "Tienda", 0, &pair);
        assert_eq!(subject, "Pending payment reminder");
    }
}
