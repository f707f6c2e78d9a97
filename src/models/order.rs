use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use super::cart::Cart;

/// Payment method id stamped on orders finalized through this gateway.
pub const GATEWAY_ID: &str = "cvu_transfer";

/// Order identifier allocated by the order subsystem.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for OrderId {
    fn from(value: u64) -> Self {
        OrderId(value)
    }
}

/// Enum representing the possible statuses of an order.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum OrderStatus {
    /// Reservation draft, never visible to the shopper as an order
    CheckoutDraft,
    Pending,
    /// Awaiting the bank transfer
    OnHold,
    Processing,
    Completed,
    Cancelled,
    Refunded,
    Failed,
}

impl OrderStatus {
    pub fn is_draft(self) -> bool {
        matches!(self, OrderStatus::CheckoutDraft)
    }

    /// Statuses from which a confirmed payment moves the order forward.
    pub fn needs_payment(self) -> bool {
        matches!(
            self,
            OrderStatus::Pending | OrderStatus::OnHold | OrderStatus::Failed | OrderStatus::Cancelled
        )
    }
}

/// Where an identifier pair came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierOrigin {
    Api,
    Backup,
}

/// CVU/Alias pair. Opaque strings to this service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IdentifierPair {
    #[schema(example = "0000003100012345678901")]
    pub cvu: String,
    #[schema(example = "tienda.pagos.cvu")]
    pub alias: String,
}

impl IdentifierPair {
    pub fn new(cvu: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            cvu: cvu.into(),
            alias: alias.into(),
        }
    }

    /// Both halves present and non-blank
    pub fn is_complete(&self) -> bool {
        !self.cvu.trim().is_empty() && !self.alias.trim().is_empty()
    }
}

/// Identifier pair frozen onto an order together with its origin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IdentifierAssignment {
    #[serde(flatten)]
    pub pair: IdentifierPair,
    pub origin: IdentifierOrigin,
}

impl IdentifierAssignment {
    pub fn api(pair: IdentifierPair) -> Self {
        Self {
            pair,
            origin: IdentifierOrigin::Api,
        }
    }

    pub fn backup(pair: IdentifierPair) -> Self {
        Self {
            pair,
            origin: IdentifierOrigin::Backup,
        }
    }

    pub fn is_backup(&self) -> bool {
        self.origin == IdentifierOrigin::Backup
    }
}

/// Billing or shipping address captured at checkout submission.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub address_1: String,
    pub address_2: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LineItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total: Decimal,
}

/// Audit trail entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderNote {
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Order record as seen by this gateway.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    /// Set while the record is a reservation draft
    pub is_provisional: bool,
    pub identifier: Option<IdentifierAssignment>,
    pub payment_method: Option<String>,
    pub items: Vec<LineItem>,
    pub total: Decimal,
    pub billing: Option<Address>,
    pub shipping: Option<Address>,
    pub notes: Vec<OrderNote>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Order {
    /// The frozen pair, if assignment completed.
    pub fn identifier_pair(&self) -> Option<&IdentifierPair> {
        self.identifier
            .as_ref()
            .map(|assignment| &assignment.pair)
            .filter(|pair| pair.is_complete())
    }

    /// Provisional and still a draft: the only state a session reservation may point at.
    pub fn is_live_reservation(&self) -> bool {
        self.is_provisional && self.status.is_draft()
    }

    pub fn uses_gateway(&self) -> bool {
        self.payment_method.as_deref() == Some(GATEWAY_ID)
    }

    pub fn billing_email(&self) -> Option<&str> {
        self.billing
            .as_ref()
            .and_then(|address| address.email.as_deref())
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }

    pub fn add_note(&mut self, message: impl Into<String>, at: DateTime<Utc>) {
        self.notes.push(OrderNote {
            message: message.into(),
            created_at: at,
        });
        self.updated_at = Some(at);
    }

    pub fn replace_items(&mut self, items: Vec<LineItem>) {
        self.total = items.iter().map(|item| item.total).sum();
        self.items = items;
    }
}

/// Input for the order subsystem when it allocates a new record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewOrder {
    pub status: OrderStatus,
    pub is_provisional: bool,
    pub payment_method: Option<String>,
    pub items: Vec<LineItem>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    /// Reservation draft built from the shopper's current cart.
    pub fn provisional_from_cart(cart: &Cart, created_at: DateTime<Utc>) -> Self {
        Self {
            status: OrderStatus::CheckoutDraft,
            is_provisional: true,
            payment_method: None,
            items: cart.to_line_items(),
            created_at,
        }
    }

    /// Plain pending order, as the platform creates one on checkout submission.
    pub fn pending(items: Vec<LineItem>, created_at: DateTime<Utc>) -> Self {
        Self {
            status: OrderStatus::Pending,
            is_provisional: false,
            payment_method: None,
            items,
            created_at,
        }
    }

    pub fn into_order(self, id: OrderId) -> Order {
        let total = self.items.iter().map(|item| item.total).sum();
        Order {
            id,
            status: self.status,
            is_provisional: self.is_provisional,
            identifier: None,
            payment_method: self.payment_method,
            items: self.items,
            total,
            billing: None,
            shipping: None,
            notes: Vec::new(),
            created_at: self.created_at,
            updated_at: None,
            paid_at: None,
        }
    }
}
