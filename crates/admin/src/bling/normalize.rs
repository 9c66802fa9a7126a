//! Mapping of Bling JSON payloads into `loja_core` records.
//!
//! Bling's field names differ between API versions and account
//! configurations, so every field is resolved through a [`FieldRule`]: an
//! ordered list of dotted paths tried until one parses. Normalization never
//! fails; unresolvable fields fall back to computed values or defaults.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use loja_core::{Customer, Order, OrderItem, Product};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::Value;

type Parser<T> = fn(&Value) -> Option<T>;

/// Ordered alias list for one field.
pub struct FieldRule<T> {
    paths: &'static [&'static str],
    parse: Parser<T>,
}

impl<T> FieldRule<T> {
    const fn new(paths: &'static [&'static str], parse: Parser<T>) -> Self {
        Self { paths, parse }
    }

    /// First alias that is present and parses.
    pub fn resolve(&self, raw: &Value) -> Option<T> {
        self.paths
            .iter()
            .find_map(|path| lookup(raw, path).and_then(self.parse))
    }

    /// Aliases in priority order.
    #[must_use]
    pub const fn paths(&self) -> &'static [&'static str] {
        self.paths
    }
}

// =============================================================================
// Alias tables
// =============================================================================

pub const ORDER_NUMBER: FieldRule<String> =
    FieldRule::new(&["numero", "numeroPedido", "number", "id"], parse_text);
pub const ORDER_PLACED_AT: FieldRule<NaiveDateTime> =
    FieldRule::new(&["data", "dataEmissao", "dataPedido", "date"], parse_timestamp);
pub const ORDER_STATUS: FieldRule<String> = FieldRule::new(
    &["situacao.nome", "situacao", "status", "situacao.valor", "situacao.id"],
    parse_text,
);
pub const ORDER_TOTAL: FieldRule<Decimal> =
    FieldRule::new(&["total", "valor", "totalPedido", "valorTotal"], parse_decimal);
pub const CUSTOMER_NAME: FieldRule<String> = FieldRule::new(
    &["contato.nome", "cliente.nome", "cliente", "nomeCliente"],
    parse_text,
);
pub const CUSTOMER_EMAIL: FieldRule<String> =
    FieldRule::new(&["contato.email", "cliente.email", "email"], parse_text);

pub const ITEM_NAME: FieldRule<String> = FieldRule::new(
    &["descricao", "produto.descricao", "produto.nome", "nome"],
    parse_text,
);
pub const ITEM_QUANTITY: FieldRule<Decimal> =
    FieldRule::new(&["quantidade", "qtde", "quantity"], parse_decimal);
pub const ITEM_UNIT_VALUE: FieldRule<Decimal> = FieldRule::new(
    &["valor", "valorUnidade", "precoUnitario", "preco"],
    parse_decimal,
);

pub const PRODUCT_ID: FieldRule<String> =
    FieldRule::new(&["id", "idProduto", "codigo"], parse_text);
pub const PRODUCT_NAME: FieldRule<String> =
    FieldRule::new(&["nome", "descricao", "name"], parse_text);
pub const PRODUCT_PRICE: FieldRule<Decimal> =
    FieldRule::new(&["preco", "precoVenda", "price", "valor"], parse_decimal);
pub const PRODUCT_STOCK: FieldRule<i64> = FieldRule::new(
    &[
        "estoque.quantidade",
        "estoque",
        "estoqueAtual",
        "stock",
        "estoque.saldoVirtualTotal",
    ],
    parse_quantity,
);
pub const PRODUCT_SKU: FieldRule<String> = FieldRule::new(&["codigo", "sku"], parse_text);
pub const PRODUCT_DESCRIPTION: FieldRule<String> = FieldRule::new(
    &["descricaoCurta", "descricaoComplementar", "description"],
    parse_text,
);
pub const PRODUCT_CATEGORY: FieldRule<String> = FieldRule::new(
    &["categoria.descricao", "categoria.nome", "categoria", "category"],
    parse_text,
);

// =============================================================================
// Records
// =============================================================================

/// Normalize one order payload.
///
/// When no total alias is present, the total is rebuilt from the line items
/// (zero without items).
#[must_use]
pub fn normalize_order(raw: &Value) -> Order {
    let items: Vec<OrderItem> = lookup(raw, "itens")
        .or_else(|| lookup(raw, "items"))
        .and_then(Value::as_array)
        .map(|items| items.iter().map(|item| normalize_item(unwrap_record(item, "item"))).collect())
        .unwrap_or_default();

    let mut order = Order {
        number: ORDER_NUMBER.resolve(raw).unwrap_or_default(),
        placed_at: ORDER_PLACED_AT.resolve(raw),
        status: ORDER_STATUS.resolve(raw).unwrap_or_default(),
        total: Decimal::ZERO,
        customer: Customer {
            name: CUSTOMER_NAME.resolve(raw).unwrap_or_default(),
            email: CUSTOMER_EMAIL.resolve(raw),
        },
        items,
    };
    order.total = ORDER_TOTAL
        .resolve(raw)
        .unwrap_or_else(|| order.items_total());
    order
}

fn normalize_item(raw: &Value) -> OrderItem {
    OrderItem {
        product_name: ITEM_NAME.resolve(raw).unwrap_or_default(),
        quantity: ITEM_QUANTITY.resolve(raw).unwrap_or_default(),
        unit_value: ITEM_UNIT_VALUE.resolve(raw).unwrap_or_default(),
    }
}

/// Normalize one product payload. Price and stock are clamped at zero.
#[must_use]
pub fn normalize_product(raw: &Value) -> Product {
    Product {
        external_id: PRODUCT_ID.resolve(raw).unwrap_or_default(),
        name: PRODUCT_NAME.resolve(raw).unwrap_or_default(),
        price: PRODUCT_PRICE
            .resolve(raw)
            .unwrap_or_default()
            .max(Decimal::ZERO),
        current_stock: PRODUCT_STOCK.resolve(raw).unwrap_or_default().max(0),
        sku: PRODUCT_SKU.resolve(raw).unwrap_or_default(),
        description: PRODUCT_DESCRIPTION.resolve(raw).unwrap_or_default(),
        category: PRODUCT_CATEGORY.resolve(raw).unwrap_or_default(),
    }
}

/// Normalize every order in a list response.
#[must_use]
pub fn normalize_orders(payload: &Value) -> Vec<Order> {
    collection(payload, Resource::Orders)
        .into_iter()
        .map(normalize_order)
        .collect()
}

/// Normalize every product in a list response.
#[must_use]
pub fn normalize_products(payload: &Value) -> Vec<Product> {
    collection(payload, Resource::Products)
        .into_iter()
        .map(normalize_product)
        .collect()
}

// =============================================================================
// Envelopes
// =============================================================================

/// Resource kinds, for the legacy `retorno` envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Orders,
    Products,
}

impl Resource {
    const fn legacy_keys(self) -> (&'static str, &'static str) {
        match self {
            Self::Orders => ("pedidos", "pedido"),
            Self::Products => ("produtos", "produto"),
        }
    }
}

/// Records of a list response.
///
/// Accepts `{"data": [...]}`, a bare array, and the legacy
/// `{"retorno": {"pedidos": [{"pedido": {...}}]}}` shape.
#[must_use]
pub fn collection(payload: &Value, resource: Resource) -> Vec<&Value> {
    let (list_key, item_key) = resource.legacy_keys();

    let list = match payload {
        Value::Array(items) => Some(items),
        Value::Object(_) => lookup(payload, "data")
            .and_then(Value::as_array)
            .or_else(|| lookup(payload, &format!("retorno.{list_key}")).and_then(Value::as_array)),
        _ => None,
    };

    list.map(|items| {
        items
            .iter()
            .map(|item| unwrap_record(item, item_key))
            .filter(|item| item.is_object())
            .collect()
    })
    .unwrap_or_default()
}

/// The record of a single-resource response (`{"data": {...}}` or the bare
/// object).
#[must_use]
pub fn single(payload: &Value) -> Option<&Value> {
    match lookup(payload, "data") {
        Some(data) if data.is_object() => Some(data),
        Some(Value::Array(items)) => items.first().filter(|item| item.is_object()),
        _ => payload
            .as_object()
            .filter(|object| !object.is_empty())
            .map(|_| payload),
    }
}

/// Strip a `{"pedido": {...}}`-style wrapper.
fn unwrap_record<'a>(value: &'a Value, key: &str) -> &'a Value {
    match value.as_object() {
        Some(object) if object.len() == 1 => object.get(key).unwrap_or(value),
        _ => value,
    }
}

/// Resolve a dotted path (`estoque.quantidade`) inside nested objects.
#[must_use]
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
        .filter(|found| !found.is_null())
}

// =============================================================================
// Parsers
// =============================================================================

fn parse_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numbers or numeric strings, including `"1.234,56"` and `"199,90"`.
fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            let repr = n.to_string();
            Decimal::from_str(&repr)
                .or_else(|_| Decimal::from_scientific(&repr))
                .ok()
        }
        Value::String(s) => parse_decimal_str(s),
        _ => None,
    }
}

fn parse_decimal_str(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let canonical = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed.to_string()
    };

    Decimal::from_str(&canonical).ok()
}

/// Whole units; fractional stock is truncated.
fn parse_quantity(value: &Value) -> Option<i64> {
    parse_decimal(value).and_then(|d| d.trunc().to_i64())
}

fn parse_timestamp(value: &Value) -> Option<NaiveDateTime> {
    value.as_str().and_then(coerce_timestamp)
}

/// Parse Bling's date strings into a local wall-clock timestamp.
///
/// Date-only values (`2024-01-01`) get a `T00:00:00` time part and
/// space-separated values (`2024-01-01 10:30:00`) get a `T` separator before
/// parsing. Offsets are dropped in favour of the wall-clock time. Bling's
/// placeholder date `0000-00-00` yields `None`.
#[must_use]
pub fn coerce_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("0000") {
        return None;
    }

    if raw.contains('/') {
        let date_part = raw.split_whitespace().next()?;
        return NaiveDate::parse_from_str(date_part, "%d/%m/%Y")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0));
    }

    let normalized = if raw.contains('T') {
        raw.to_string()
    } else if let Some((date, time)) = raw.split_once(' ') {
        format!("{date}T{}", time.trim())
    } else {
        format!("{raw}T00:00:00")
    };

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(with_offset.naive_local());
    }

    NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M"))
        .ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_order_total_aliases_in_priority_order() {
        for alias in ORDER_TOTAL.paths() {
            let mut raw = json!({ "numero": "1" });
            raw[*alias] = json!("42.50");
            assert_eq!(normalize_order(&raw).total, dec("42.50"), "alias {alias}");
        }

        let raw = json!({ "total": "10.00", "valorTotal": "99.00" });
        assert_eq!(normalize_order(&raw).total, dec("10.00"));
    }

    #[test]
    fn test_order_total_rebuilt_from_items() {
        let raw = json!({
            "numero": "1002",
            "itens": [{ "valor": "50.00", "quantidade": "2" }]
        });
        assert_eq!(normalize_order(&raw).total, dec("100.00"));
    }

    #[test]
    fn test_order_total_from_multiple_wrapped_items() {
        let raw = json!({
            "numero": "1003",
            "itens": [
                { "item": { "descricao": "Camiseta", "valorUnidade": 39.9, "quantidade": 3 } },
                { "descricao": "Caneca", "valor": "25,00", "quantidade": 1 }
            ]
        });
        let order = normalize_order(&raw);
        assert_eq!(order.total, dec("144.70"));
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[0].product_name, "Camiseta");
    }

    #[test]
    fn test_order_total_from_huge_items_saturates() {
        let raw = json!({
            "numero": "1",
            "itens": [{ "valor": "79228162514264337593543950335", "quantidade": "2" }]
        });
        assert_eq!(normalize_order(&raw).total, Decimal::MAX);

        let raw = json!({
            "numero": "2",
            "itens": [
                { "valor": "79228162514264337593543950335", "quantidade": 1 },
                { "valor": "79228162514264337593543950335", "quantidade": 1 }
            ]
        });
        assert_eq!(normalize_order(&raw).total, Decimal::MAX);
    }

    #[test]
    fn test_order_total_zero_without_total_or_items() {
        let raw = json!({ "numero": "1004" });
        assert_eq!(normalize_order(&raw).total, Decimal::ZERO);
    }

    #[test]
    fn test_order_fields() {
        let raw = json!({
            "numero": 1001,
            "data": "2024-01-01",
            "total": 199.9,
            "situacao": { "id": 6, "nome": "Em aberto" },
            "contato": { "nome": "Ana", "email": "ana@example.com" }
        });
        let order = normalize_order(&raw);

        assert_eq!(order.number, "1001");
        assert_eq!(order.total, dec("199.9"));
        assert_eq!(order.status, "Em aberto");
        assert_eq!(order.customer.name, "Ana");
        assert_eq!(order.customer.email.as_deref(), Some("ana@example.com"));
        assert_eq!(order.placed_on(), NaiveDate::from_ymd_opt(2024, 1, 1));
    }

    #[test]
    fn test_legacy_customer_and_numeric_status() {
        let raw = json!({
            "numero": "7",
            "cliente": { "nome": "Bruno" },
            "situacao": { "valor": 9 }
        });
        let order = normalize_order(&raw);
        assert_eq!(order.customer.name, "Bruno");
        assert_eq!(order.customer.email, None);
        assert_eq!(order.status, "9");
    }

    #[test]
    fn test_product_stock_aliases() {
        let payloads = [
            json!({ "estoque": { "quantidade": 12 } }),
            json!({ "estoque": 12 }),
            json!({ "estoqueAtual": "12" }),
            json!({ "stock": 12.0 }),
        ];
        for raw in &payloads {
            assert_eq!(normalize_product(raw).current_stock, 12, "payload {raw}");
        }
    }

    #[test]
    fn test_product_stock_defaults_to_zero() {
        assert_eq!(normalize_product(&json!({ "id": 1 })).current_stock, 0);
        // An estoque object without a quantity is not a stock value
        let raw = json!({ "estoque": { "minimo": 2 } });
        assert_eq!(normalize_product(&raw).current_stock, 0);
    }

    #[test]
    fn test_product_fields_and_non_negative_numbers() {
        let raw = json!({
            "id": 16_138_744_312_u64,
            "nome": "Caneca Esmaltada",
            "codigo": "CAN-001",
            "preco": -5,
            "estoque": { "quantidade": -3 },
            "descricaoCurta": "Caneca 350ml",
            "categoria": { "id": 1, "descricao": "Cozinha" }
        });
        let product = normalize_product(&raw);

        assert_eq!(product.external_id, "16138744312");
        assert_eq!(product.name, "Caneca Esmaltada");
        assert_eq!(product.sku, "CAN-001");
        assert_eq!(product.price, Decimal::ZERO);
        assert_eq!(product.current_stock, 0);
        assert_eq!(product.description, "Caneca 350ml");
        assert_eq!(product.category, "Cozinha");
    }

    #[test]
    fn test_product_missing_price_is_zero() {
        let product = normalize_product(&json!({ "id": "9", "nome": "Brinde" }));
        assert_eq!(product.price, Decimal::ZERO);
    }

    #[test]
    fn test_collection_envelopes() {
        let v3 = json!({ "data": [{ "numero": "1" }, { "numero": "2" }] });
        assert_eq!(normalize_orders(&v3).len(), 2);

        let bare = json!([{ "numero": "1" }]);
        assert_eq!(normalize_orders(&bare).len(), 1);

        let legacy = json!({ "retorno": { "pedidos": [{ "pedido": { "numero": "5", "totalPedido": "10" } }] } });
        let orders = normalize_orders(&legacy);
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].number, "5");
        assert_eq!(orders[0].total, dec("10"));

        let legacy_products = json!({ "retorno": { "produtos": [{ "produto": { "codigo": "X" } }] } });
        assert_eq!(normalize_products(&legacy_products)[0].sku, "X");

        assert!(normalize_orders(&json!({ "data": null })).is_empty());
        assert!(normalize_orders(&json!("unexpected")).is_empty());
    }

    #[test]
    fn test_single_record() {
        let wrapped = json!({ "data": { "id": 1 } });
        assert_eq!(single(&wrapped), Some(&json!({ "id": 1 })));

        let bare = json!({ "id": 2 });
        assert_eq!(single(&bare), Some(&bare));

        assert_eq!(single(&json!({})), None);
    }

    #[test]
    fn test_coerce_timestamp() {
        let midnight = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let half_past_ten = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();

        assert_eq!(coerce_timestamp("2024-01-01"), Some(midnight));
        assert_eq!(coerce_timestamp("2024-01-01 10:30:00"), Some(half_past_ten));
        assert_eq!(coerce_timestamp("2024-01-01T10:30:00"), Some(half_past_ten));
        assert_eq!(coerce_timestamp("2024-01-01T10:30:00-03:00"), Some(half_past_ten));
        assert_eq!(coerce_timestamp("01/01/2024"), Some(midnight));
        assert_eq!(coerce_timestamp("0000-00-00"), None);
        assert_eq!(coerce_timestamp("not a date"), None);
    }

    #[test]
    fn test_decimal_comma_strings() {
        assert_eq!(parse_decimal(&json!("199,90")), Some(dec("199.90")));
        assert_eq!(parse_decimal(&json!("1.234,56")), Some(dec("1234.56")));
        assert_eq!(parse_decimal(&json!("")), None);
        assert_eq!(parse_decimal(&json!({ "valor": 1 })), None);
    }
}
