//! Status enums for backend-owned entities.
//!
//! Wire values follow the backend (`SCREAMING_SNAKE_CASE`); labels are the
//! French wording shown in the storefront.

use serde::{Deserialize, Serialize};

/// Lifecycle of a quote (devis).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteStatus {
    #[default]
    Pending,
    InProgress,
    Sent,
    Accepted,
    Rejected,
    Expired,
}

impl QuoteStatus {
    /// Label shown to the customer.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "En attente",
            Self::InProgress => "En cours de traitement",
            Self::Sent => "Envoyé",
            Self::Accepted => "Accepté",
            Self::Rejected => "Refusé",
            Self::Expired => "Expiré",
        }
    }

    /// Whether the quote document can be downloaded.
    #[must_use]
    pub const fn has_document(&self) -> bool {
        matches!(self, Self::Sent | Self::Accepted | Self::Expired)
    }
}

/// Review state of a professional-account request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostulationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl PostulationStatus {
    /// Label shown to the customer.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "En cours d'examen",
            Self::Approved => "Acceptée",
            Self::Rejected => "Refusée",
        }
    }
}

/// Kind of customer account. Professionals see trade pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    #[default]
    Particulier,
    Professionnel,
}

impl AccountType {
    /// Label shown to the customer.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Particulier => "Particulier",
            Self::Professionnel => "Professionnel",
        }
    }

    #[must_use]
    pub const fn is_professional(&self) -> bool {
        matches!(self, Self::Professionnel)
    }
}

/// Stock availability, derived from the quantity the backend reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    /// Quantity at or below which stock is reported as low.
    pub const LOW_STOCK_THRESHOLD: u32 = 5;

    /// Classify a stock quantity.
    #[must_use]
    pub const fn from_quantity(quantity: u32) -> Self {
        match quantity {
            0 => Self::OutOfStock,
            q if q <= Self::LOW_STOCK_THRESHOLD => Self::LowStock,
            _ => Self::InStock,
        }
    }

    /// Label shown on product cards.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::InStock => "En stock",
            Self::LowStock => "Stock limité",
            Self::OutOfStock => "Rupture de stock",
        }
    }

    /// CSS modifier used by the templates.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self {
            Self::InStock => "stock--in",
            Self::LowStock => "stock--low",
            Self::OutOfStock => "stock--out",
        }
    }

    #[must_use]
    pub const fn is_available(&self) -> bool {
        !matches!(self, Self::OutOfStock)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_status_wire_format() {
        let status: QuoteStatus = serde_json::from_str("\"IN_PROGRESS\"").unwrap();
        assert_eq!(status, QuoteStatus::InProgress);
        assert_eq!(status.label(), "En cours de traitement");
    }

    #[test]
    fn test_quote_document_availability() {
        assert!(!QuoteStatus::Pending.has_document());
        assert!(QuoteStatus::Sent.has_document());
    }

    #[test]
    fn test_account_type_wire_format() {
        let account: AccountType = serde_json::from_str("\"PROFESSIONNEL\"").unwrap();
        assert!(account.is_professional());
    }

    #[test]
    fn test_stock_status_thresholds() {
        assert_eq!(StockStatus::from_quantity(0), StockStatus::OutOfStock);
        assert_eq!(StockStatus::from_quantity(1), StockStatus::LowStock);
        assert_eq!(StockStatus::from_quantity(5), StockStatus::LowStock);
        assert_eq!(StockStatus::from_quantity(6), StockStatus::InStock);
        assert!(!StockStatus::OutOfStock.is_available());
    }
}
