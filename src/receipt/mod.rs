//! # Receipt Model
//!
//! An immutable receipt as supplied by the caller. Every monetary value is a
//! [`Decimal`] printed with its own scale; nothing here adds, rounds or
//! re-derives amounts. A line total of `5.00` prints as `5.00` even if
//! quantity times price says otherwise.
//!
//! Receipts are built with [`ReceiptBuilder`] or deserialized from JSON.
//! Both paths run the same validation.
//!
//! ```
//! use rasid::receipt::{LineItem, Receipt};
//! use rust_decimal::Decimal;
//!
//! let receipt = Receipt::builder("STORE")
//!     .item(LineItem::new("Coffee", Decimal::new(2, 0), Decimal::new(250, 2), Decimal::new(500, 2)))
//!     .subtotal(Decimal::new(500, 2))
//!     .total(Decimal::new(500, 2))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(receipt.items()[0].line_total.to_string(), "5.00");
//! ```

pub mod layout;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ReceiptError;

pub use layout::{Block, TextAlign};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub store_name: String,
    #[serde(default)]
    pub address: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl LineItem {
    pub fn new(
        name: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
        line_total: Decimal,
    ) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit_price,
            line_total,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<Decimal>,
    pub total: Decimal,
}

/// Captions printed next to the totals. Overridable for other languages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Labels {
    pub items: String,
    pub subtotal: String,
    pub tax: String,
    pub discount: String,
    pub total: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            items: "ITEMS".into(),
            subtotal: "Subtotal".into(),
            tax: "Tax".into(),
            discount: "Discount".into(),
            total: "TOTAL".into(),
        }
    }
}

impl Labels {
    pub fn arabic() -> Self {
        Self {
            items: "الأصناف".into(),
            subtotal: "المجموع الفرعي".into(),
            tax: "الضريبة (10٪)".into(),
            discount: "الخصم".into(),
            total: "الإجمالي".into(),
        }
    }
}

/// A validated receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ReceiptData", rename_all = "camelCase")]
pub struct Receipt {
    header: Header,
    items: Vec<LineItem>,
    totals: Totals,
    footer: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    labels: Labels,
}

/// Unvalidated wire form.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptData {
    header: Header,
    #[serde(default)]
    items: Vec<LineItem>,
    #[serde(default)]
    totals: Totals,
    #[serde(default)]
    footer: Vec<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    labels: Labels,
}

impl TryFrom<ReceiptData> for Receipt {
    type Error = ReceiptError;

    fn try_from(data: ReceiptData) -> Result<Self, Self::Error> {
        let receipt = Receipt {
            header: data.header,
            items: data.items,
            totals: data.totals,
            footer: data.footer,
            currency: data.currency,
            timestamp: data.timestamp,
            labels: data.labels,
        };
        receipt.validate()?;
        Ok(receipt)
    }
}

impl Receipt {
    pub fn builder(store_name: impl Into<String>) -> ReceiptBuilder {
        ReceiptBuilder::new(store_name)
    }

    fn validate(&self) -> Result<(), ReceiptError> {
        if self.header.store_name.trim().is_empty() {
            return Err(ReceiptError::MissingStoreName);
        }
        for (index, item) in self.items.iter().enumerate() {
            if item.name.trim().is_empty() {
                return Err(ReceiptError::BlankItemName { index });
            }
            if item.quantity.is_sign_negative() && !item.quantity.is_zero() {
                return Err(ReceiptError::NegativeQuantity {
                    index,
                    quantity: item.quantity,
                });
            }
        }
        Ok(())
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    pub fn footer(&self) -> &[String] {
        &self.footer
    }

    pub fn currency(&self) -> Option<&str> {
        self.currency.as_deref()
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Every printable string on the receipt, in print order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.header.store_name.as_str())
            .chain(self.header.address.iter().map(String::as_str))
            .chain(self.timestamp.as_deref())
            .chain([
                self.labels.items.as_str(),
                self.labels.subtotal.as_str(),
                self.labels.tax.as_str(),
                self.labels.total.as_str(),
            ])
            .chain(
                self.totals
                    .discount
                    .is_some()
                    .then_some(self.labels.discount.as_str()),
            )
            .chain(self.items.iter().map(|item| item.name.as_str()))
            .chain(self.footer.iter().map(String::as_str))
            .chain(self.currency.as_deref())
    }

    /// The Arabic demo receipt: three produce items with 10% tax, amounts
    /// in Egyptian pounds.
    pub fn sample_arabic() -> Self {
        let item = |name: &str, qty: i64, price: i64, total: i64| {
            LineItem::new(
                name,
                Decimal::new(qty, 0),
                Decimal::new(price, 2),
                Decimal::new(total, 2),
            )
        };

        Receipt {
            header: Header {
                store_name: "متجر عينة".into(),
                address: vec!["123 شارع الرئيسي".into()],
            },
            items: vec![
                item("تفاح", 2, 250, 500),
                item("موز", 3, 150, 450),
                item("برتقال", 1, 300, 300),
            ],
            totals: Totals {
                subtotal: Decimal::new(1250, 2),
                tax: Decimal::new(125, 2),
                discount: None,
                total: Decimal::new(1375, 2),
            },
            footer: vec!["شكراً لك على الشراء!".into(), "نتمنى رؤيتك مرة أخرى".into()],
            currency: Some("ج.م".into()),
            timestamp: None,
            labels: Labels::arabic(),
        }
    }
}

/// Builder for [`Receipt`]. Totals default to zero.
#[derive(Debug, Clone)]
pub struct ReceiptBuilder {
    header: Header,
    items: Vec<LineItem>,
    totals: Totals,
    footer: Vec<String>,
    currency: Option<String>,
    timestamp: Option<String>,
    labels: Labels,
}

impl ReceiptBuilder {
    pub fn new(store_name: impl Into<String>) -> Self {
        Self {
            header: Header {
                store_name: store_name.into(),
                address: Vec::new(),
            },
            items: Vec::new(),
            totals: Totals::default(),
            footer: Vec::new(),
            currency: None,
            timestamp: None,
            labels: Labels::default(),
        }
    }

    pub fn address(mut self, line: impl Into<String>) -> Self {
        self.header.address.push(line.into());
        self
    }

    pub fn item(mut self, item: LineItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn items(mut self, items: impl IntoIterator<Item = LineItem>) -> Self {
        self.items.extend(items);
        self
    }

    pub fn subtotal(mut self, value: Decimal) -> Self {
        self.totals.subtotal = value;
        self
    }

    pub fn tax(mut self, value: Decimal) -> Self {
        self.totals.tax = value;
        self
    }

    pub fn discount(mut self, value: Decimal) -> Self {
        self.totals.discount = Some(value);
        self
    }

    pub fn total(mut self, value: Decimal) -> Self {
        self.totals.total = value;
        self
    }

    pub fn footer(mut self, line: impl Into<String>) -> Self {
        self.footer.push(line.into());
        self
    }

    pub fn currency(mut self, label: impl Into<String>) -> Self {
        self.currency = Some(label.into());
        self
    }

    /// Caller-formatted date/time line printed under the header.
    pub fn timestamp(mut self, line: impl Into<String>) -> Self {
        self.timestamp = Some(line.into());
        self
    }

    pub fn labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    pub fn build(self) -> Result<Receipt, ReceiptError> {
        let receipt = Receipt {
            header: self.header,
            items: self.items,
            totals: self.totals,
            footer: self.footer,
            currency: self.currency,
            timestamp: self.timestamp,
            labels: self.labels,
        };
        receipt.validate()?;
        Ok(receipt)
    }
}
