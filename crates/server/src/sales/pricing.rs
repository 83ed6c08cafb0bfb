//! Sale totals

use crate::core::forms::parse_decimal;

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One priced line of a sale
#[derive(Debug, Clone, PartialEq)]
pub struct SaleLine {
    pub produto_id: i64,
    pub quantidade: f64,
    pub preco_unitario: f64,
}

impl SaleLine {
    pub fn total(&self) -> f64 {
        round_cents(self.quantidade * self.preco_unitario)
    }
}

/// Discount percentage from the form: blank or malformed is 0, and the
/// result is clamped to `0..=100`.
pub fn normalize_discount(raw: &str) -> f64 {
    parse_decimal(raw).unwrap_or(0.0).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaleTotals {
    pub valor_bruto: f64,
    pub desconto_percentual: f64,
    pub desconto: f64,
    pub valor_liquido: f64,
}

impl SaleTotals {
    pub fn compute(lines: &[SaleLine], discount_percent: f64) -> Self {
        let desconto_percentual = if discount_percent.is_finite() {
            discount_percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        let valor_bruto = round_cents(lines.iter().map(SaleLine::total).sum());
        let desconto = round_cents(valor_bruto * desconto_percentual / 100.0);

        Self {
            valor_bruto,
            desconto_percentual,
            desconto,
            valor_liquido: round_cents(valor_bruto - desconto),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(produto_id: i64, quantidade: f64, preco_unitario: f64) -> SaleLine {
        SaleLine {
            produto_id,
            quantidade,
            preco_unitario,
        }
    }

    #[test]
    fn test_totals_with_discount() {
        let totals = SaleTotals::compute(&[line(1, 2.0, 10.0), line(2, 1.5, 4.0)], 10.0);
        assert_eq!(totals.valor_bruto, 26.0);
        assert_eq!(totals.desconto, 2.6);
        assert_eq!(totals.valor_liquido, 23.4);
    }

    #[test]
    fn test_totals_without_discount() {
        let totals = SaleTotals::compute(&[line(1, 3.0, 19.9)], 0.0);
        assert_eq!(totals.valor_bruto, 59.7);
        assert_eq!(totals.desconto, 0.0);
        assert_eq!(totals.valor_liquido, 59.7);
    }

    #[test]
    fn test_discount_is_clamped() {
        let totals = SaleTotals::compute(&[line(1, 1.0, 50.0)], 250.0);
        assert_eq!(totals.desconto_percentual, 100.0);
        assert_eq!(totals.valor_liquido, 0.0);

        let totals = SaleTotals::compute(&[line(1, 1.0, 50.0)], -5.0);
        assert_eq!(totals.desconto, 0.0);
        assert_eq!(totals.valor_liquido, 50.0);
    }

    #[test]
    fn test_normalize_discount() {
        assert_eq!(normalize_discount(""), 0.0);
        assert_eq!(normalize_discount("abc"), 0.0);
        assert_eq!(normalize_discount("7,5"), 7.5);
        assert_eq!(normalize_discount("150"), 100.0);
        assert_eq!(normalize_discount("-3"), 0.0);
    }
}
