pub mod builtins;
pub mod graph;
pub mod pricing;

pub use builtins::{progress, sum, visibility, visibility_key, Condition, DerivationSpec};
pub use graph::{ComputeFn, DerivationGraph, DerivedField, DerivedUpdate, Inputs};
pub use pricing::{
    CouponRule, CurrencyRule, Discount, PriceBreakdown, PriceComponent, PricingRules,
};
