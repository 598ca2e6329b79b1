//! Air waybill (AWB) shipping labels.
//!
//! Labels are self-contained HTML documents sized for 100mm x 150mm label
//! stock; printing from the browser produces the physical label.

use askama::Template;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::{OrderView, Store};

/// Shown for header fields that have no value.
const NOT_AVAILABLE: &str = "N/A";

/// Everything printed on a label. Blank fields print empty.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AwbDetails {
    pub awb_number: Option<String>,
    pub order_id: Option<String>,
    pub courier: Option<String>,
    /// Preformatted date; today's date when absent.
    pub date: Option<String>,
    pub sender_name: String,
    pub sender_address: String,
    pub sender_phone: String,
    pub receiver_name: String,
    pub receiver_address: String,
    pub receiver_phone: String,
    pub contents: String,
    /// Kilograms.
    pub weight: Option<Decimal>,
    pub dimensions: String,
    pub price: String,
    pub payment_method: String,
}

struct AwbRow<'a> {
    kind: &'static str,
    details: &'a str,
    address: String,
    phone: &'a str,
}

#[derive(Template)]
#[template(path = "awb.html")]
struct AwbDocument<'a> {
    awb_number: &'a str,
    order_id: &'a str,
    courier: &'a str,
    date: String,
    rows: Vec<AwbRow<'a>>,
}

impl AwbDetails {
    /// Build label details from a populated order and the seller's store.
    #[must_use]
    pub fn from_order(view: &OrderView, store: Option<&Store>) -> Self {
        let order = &view.order;
        let receiver = view.ship_to();

        let contents = view
            .order_items
            .iter()
            .map(|line| {
                let name = line
                    .product
                    .as_ref()
                    .map_or("Unknown product", |p| p.name.as_str());
                format!("{name} x{}", line.item.quantity)
            })
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            awb_number: order.awb_number.clone(),
            order_id: Some(order.id.to_string()),
            courier: order.courier.clone(),
            date: Some(order.created_at.format("%d/%m/%Y").to_string()),
            sender_name: store.map(|s| s.name.clone()).unwrap_or_default(),
            sender_address: store.map(|s| s.address.clone()).unwrap_or_default(),
            sender_phone: store.map(|s| s.contact.clone()).unwrap_or_default(),
            receiver_name: receiver
                .as_ref()
                .map_or_else(|| view.customer_name(), |r| r.name.clone()),
            receiver_address: receiver.as_ref().map(|r| r.one_line()).unwrap_or_default(),
            receiver_phone: receiver
                .as_ref()
                .map(|r| r.phone.clone())
                .or_else(|| order.guest_phone.clone())
                .unwrap_or_default(),
            contents,
            weight: None,
            dimensions: String::new(),
            price: format!("{:.2}", order.total),
            payment_method: order.payment_method.as_str().to_string(),
        }
    }

    /// Download name, `AWB_<awb number | order id | bill>.html`.
    #[must_use]
    pub fn file_name(&self) -> String {
        let stem = non_blank(self.awb_number.as_deref())
            .or_else(|| non_blank(self.order_id.as_deref()))
            .unwrap_or("bill");
        format!("AWB_{stem}.html")
    }

    /// Render the printable label.
    ///
    /// # Errors
    ///
    /// Returns error if the template fails to render.
    pub fn render(&self) -> Result<String, askama::Error> {
        let weight = self
            .weight
            .map(|w| format!("{} kg", w.normalize()))
            .unwrap_or_default();

        let rows = vec![
            AwbRow {
                kind: "From (Sender)",
                details: &self.sender_name,
                address: self.sender_address.clone(),
                phone: &self.sender_phone,
            },
            AwbRow {
                kind: "To (Receiver)",
                details: &self.receiver_name,
                address: self.receiver_address.clone(),
                phone: &self.receiver_phone,
            },
            AwbRow {
                kind: "Product",
                details: &self.contents,
                address: weight,
                phone: &self.dimensions,
            },
            AwbRow {
                kind: "Price",
                details: &self.price,
                address: String::new(),
                phone: "",
            },
            AwbRow {
                kind: "Payment Method",
                details: &self.payment_method,
                address: String::new(),
                phone: "",
            },
        ];

        AwbDocument {
            awb_number: non_blank(self.awb_number.as_deref()).unwrap_or(NOT_AVAILABLE),
            order_id: non_blank(self.order_id.as_deref()).unwrap_or(NOT_AVAILABLE),
            courier: non_blank(self.courier.as_deref()).unwrap_or(NOT_AVAILABLE),
            date: non_blank(self.date.as_deref()).map_or_else(
                || Utc::now().format("%d/%m/%Y").to_string(),
                ToString::to_string,
            ),
            rows,
        }
        .render()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
