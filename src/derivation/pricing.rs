//! Price total calculation.
//!
//! The total is assembled in a fixed sequence; reordering the stages changes
//! the result:
//! 1. Sum the base line items
//! 2. Add the flat add-ons
//! 3. Replace the running total with the plan override, if one is selected
//! 4. Subtract the coupon discount, clamping at zero
//! 5. Add tax on the discounted amount
//! 6. Apply the currency multiplier
//!
//! Amounts are rounded to cents once, at the end.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::graph::{DerivedField, Inputs};
use crate::schema::FieldValue;

/// One priced field.
///
/// The amount it contributes is, in order of preference:
/// - `amount` when the field is checked/non-empty (fixed-price add-ons)
/// - `prices[text]` when a price table is given (select options)
/// - the field's numeric value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceComponent {
    pub field: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub prices: HashMap<String, f64>,
}

impl PriceComponent {
    pub fn numeric(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Default::default()
        }
    }

    pub fn fixed(field: impl Into<String>, amount: f64) -> Self {
        Self {
            field: field.into(),
            amount: Some(amount),
            prices: HashMap::new(),
        }
    }

    pub fn table(field: impl Into<String>, prices: HashMap<String, f64>) -> Self {
        Self {
            field: field.into(),
            amount: None,
            prices,
        }
    }

    fn value(&self, value: &FieldValue) -> Option<f64> {
        if value.is_empty() {
            return None;
        }
        if let Some(amount) = self.amount {
            return value.as_bool().then_some(amount);
        }
        if !self.prices.is_empty() {
            return self.prices.get(&value.as_text()).copied();
        }
        value.as_number()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Discount {
    /// Fixed amount off
    Flat { amount: f64 },
    /// Fraction of the running total, e.g. 0.15
    Percent { rate: f64 },
}

/// Coupon codes read from a text field. A numeric value is a flat discount.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CouponRule {
    pub field: String,
    #[serde(default)]
    pub codes: HashMap<String, Discount>,
}

impl CouponRule {
    fn discount(&self, value: &FieldValue, running: f64) -> f64 {
        if value.is_blank() {
            return 0.0;
        }
        let code = value.as_text();
        let code = code.trim();
        let discount = self
            .codes
            .get(code)
            .or_else(|| self.codes.get(&code.to_uppercase()));
        match discount {
            Some(Discount::Flat { amount }) => *amount,
            Some(Discount::Percent { rate }) => running * rate,
            None => value.as_number().unwrap_or(0.0),
        }
    }
}

/// Currency selected in a field, mapped to a multiplier.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CurrencyRule {
    pub field: String,
    #[serde(default)]
    pub rates: HashMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PricingRules {
    #[serde(default)]
    pub line_items: Vec<PriceComponent>,
    #[serde(default)]
    pub add_ons: Vec<PriceComponent>,
    #[serde(default)]
    pub plan_override: Option<PriceComponent>,
    #[serde(default)]
    pub coupon: Option<CouponRule>,
    /// Tax as a fraction of the discounted total, e.g. 0.10
    #[serde(default)]
    pub tax_rate: f64,
    #[serde(default)]
    pub currency: Option<CurrencyRule>,
}

/// Every intermediate amount of a calculation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub base: f64,
    pub add_ons: f64,
    pub overridden: bool,
    pub discount: f64,
    pub tax: f64,
    pub multiplier: f64,
    pub total: f64,
}

impl PricingRules {
    /// Field names read by these rules, in stage order, without duplicates.
    pub fn input_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = Vec::new();
        let mut push = |name: &str| {
            if !fields.iter().any(|f| f == name) {
                fields.push(name.to_string());
            }
        };
        self.line_items.iter().for_each(|c| push(&c.field));
        self.add_ons.iter().for_each(|c| push(&c.field));
        if let Some(plan) = &self.plan_override {
            push(&plan.field);
        }
        if let Some(coupon) = &self.coupon {
            push(&coupon.field);
        }
        if let Some(currency) = &self.currency {
            push(&currency.field);
        }
        fields
    }

    pub fn calculate<'a, F>(&self, lookup: F) -> PriceBreakdown
    where
        F: Fn(&str) -> &'a FieldValue,
    {
        let base: f64 = self
            .line_items
            .iter()
            .filter_map(|c| c.value(lookup(&c.field)))
            .sum();
        let add_ons: f64 = self
            .add_ons
            .iter()
            .filter_map(|c| c.value(lookup(&c.field)))
            .sum();
        let mut running = base + add_ons;

        let mut overridden = false;
        if let Some(plan) = &self.plan_override {
            if let Some(amount) = plan.value(lookup(&plan.field)) {
                running = amount;
                overridden = true;
            }
        }

        let discount = self
            .coupon
            .as_ref()
            .map(|coupon| coupon.discount(lookup(&coupon.field), running))
            .unwrap_or(0.0);
        running = (running - discount).max(0.0);

        let tax = running * self.tax_rate;
        running += tax;

        let multiplier = self
            .currency
            .as_ref()
            .and_then(|currency| {
                let code = lookup(&currency.field).as_text();
                currency.rates.get(code.trim()).copied()
            })
            .unwrap_or(1.0);
        running *= multiplier;

        PriceBreakdown {
            base,
            add_ons,
            overridden,
            discount,
            tax,
            multiplier,
            total: round_cents(running),
        }
    }

    /// A derived field producing the rounded total.
    pub fn into_derived(self, name: impl Into<String>) -> DerivedField {
        let inputs = self.input_fields();
        DerivedField::new(name, inputs, move |values: &Inputs<'_>| {
            FieldValue::Number(self.calculate(|field| values.get(field)).total)
        })
    }
}

pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
