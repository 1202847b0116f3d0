use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// 資料表中的時間欄位格式
pub const DATETIME_STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Text,
    Number,
}

impl AttributeKind {
    pub fn sql_type(&self) -> &'static str {
        match self {
            AttributeKind::Text => "TEXT",
            AttributeKind::Number => "REAL",
        }
    }
}

/// Input schema after header normalization, in source column order.
pub const INPUT_ATTRIBUTES: &[(&str, AttributeKind)] = &[
    ("invoice_id", AttributeKind::Text),
    ("branch", AttributeKind::Text),
    ("city", AttributeKind::Text),
    ("customer_type", AttributeKind::Text),
    ("gender", AttributeKind::Text),
    ("product_line", AttributeKind::Text),
    ("unit_price", AttributeKind::Number),
    ("quantity", AttributeKind::Number),
    ("tax_amount", AttributeKind::Number),
    ("sales", AttributeKind::Number),
    ("date", AttributeKind::Text),
    ("time", AttributeKind::Text),
    ("payment_mode", AttributeKind::Text),
    ("cogs", AttributeKind::Number),
    ("gross_margin_percentage", AttributeKind::Number),
    ("gross_income", AttributeKind::Number),
    ("rating", AttributeKind::Number),
];

/// 一個自然鍵欄位的值
///
/// Numbers compare by bit pattern so that they can be hashed; two prices are the
/// same key only when they parsed to the identical `f64`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyValue {
    Number(f64),
    Text(String),
}

impl PartialEq for KeyValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (KeyValue::Text(a), KeyValue::Text(b)) => a == b,
            (KeyValue::Number(a), KeyValue::Number(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for KeyValue {}

impl Hash for KeyValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            KeyValue::Text(s) => {
                0u8.hash(state);
                s.hash(state);
            }
            KeyValue::Number(n) => {
                1u8.hash(state);
                n.to_bits().hash(state);
            }
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Text(s) => write!(f, "{}", s),
            KeyValue::Number(n) => write!(f, "{}", n),
        }
    }
}

/// One invoice line of the flat extract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSalesRecord {
    pub invoice_id: String,
    pub branch: String,
    pub city: String,
    pub customer_type: String,
    pub gender: String,
    pub product_line: String,
    pub unit_price: f64,
    pub quantity: i64,
    pub tax_amount: f64,
    pub sales: f64,
    pub date: String,
    pub time: String,
    pub payment_mode: String,
    pub cogs: f64,
    pub gross_margin_percentage: f64,
    pub gross_income: f64,
    pub rating: f64,
}

impl RawSalesRecord {
    pub fn attribute_kind(name: &str) -> Option<AttributeKind> {
        INPUT_ATTRIBUTES
            .iter()
            .find(|(attr, _)| *attr == name)
            .map(|(_, kind)| *kind)
    }

    /// 依欄位名稱取值，未知欄位回傳 `None`
    pub fn attribute(&self, name: &str) -> Option<KeyValue> {
        let text = |s: &String| Some(KeyValue::Text(s.clone()));
        match name {
            "invoice_id" => text(&self.invoice_id),
            "branch" => text(&self.branch),
            "city" => text(&self.city),
            "customer_type" => text(&self.customer_type),
            "gender" => text(&self.gender),
            "product_line" => text(&self.product_line),
            "unit_price" => Some(KeyValue::Number(self.unit_price)),
            "quantity" => Some(KeyValue::Number(self.quantity as f64)),
            "tax_amount" => Some(KeyValue::Number(self.tax_amount)),
            "sales" => Some(KeyValue::Number(self.sales)),
            "date" => text(&self.date),
            "time" => text(&self.time),
            "payment_mode" => text(&self.payment_mode),
            "cogs" => Some(KeyValue::Number(self.cogs)),
            "gross_margin_percentage" => Some(KeyValue::Number(self.gross_margin_percentage)),
            "gross_income" => Some(KeyValue::Number(self.gross_income)),
            "rating" => Some(KeyValue::Number(self.rating)),
            _ => None,
        }
    }
}

/// A record carrying its merged invoice timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedSalesRecord {
    pub record: RawSalesRecord,
    pub invoice_datetime: NaiveDateTime,
}

/// 維度表的定義：表名、代理鍵欄位與自然鍵欄位
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionSpec {
    pub table: String,
    pub id_column: String,
    pub key_attributes: Vec<String>,
}

impl DimensionSpec {
    pub fn new(table: &str, id_column: &str, key_attributes: &[String]) -> Self {
        Self {
            table: table.to_string(),
            id_column: id_column.to_string(),
            key_attributes: key_attributes.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DimensionRow {
    pub id: i64,
    pub values: Vec<KeyValue>,
}

/// A deduplicated dimension with dense surrogate ids starting at 1.
#[derive(Debug, Clone)]
pub struct Dimension {
    pub table: String,
    pub id_column: String,
    pub columns: Vec<(String, AttributeKind)>,
    rows: Vec<DimensionRow>,
    index: HashMap<Vec<KeyValue>, i64>,
}

impl Dimension {
    pub fn new(table: &str, id_column: &str, columns: Vec<(String, AttributeKind)>) -> Self {
        Self {
            table: table.to_string(),
            id_column: id_column.to_string(),
            columns,
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// 回傳既有代理鍵，或依出現順序配發下一個
    pub(crate) fn get_or_insert(&mut self, values: Vec<KeyValue>) -> i64 {
        if let Some(id) = self.index.get(&values) {
            return *id;
        }
        let id = self.rows.len() as i64 + 1;
        self.index.insert(values.clone(), id);
        self.rows.push(DimensionRow { id, values });
        id
    }

    pub fn lookup(&self, values: &[KeyValue]) -> Option<i64> {
        self.index.get(values).copied()
    }

    pub fn row(&self, id: i64) -> Option<&DimensionRow> {
        if id < 1 {
            return None;
        }
        self.rows.get((id - 1) as usize)
    }

    pub fn rows(&self) -> &[DimensionRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn key_attributes(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesFact {
    pub invoice_id: String,
    pub branch_id: i64,
    pub customer_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub cogs: f64,
    pub tax_amount: f64,
    pub sales: f64,
    pub gross_income: f64,
    pub gross_margin_percentage: f64,
    pub invoice_datetime: NaiveDateTime,
    pub payment_mode: String,
    pub rating: f64,
}

#[derive(Debug, Clone)]
pub struct StarSchema {
    pub branches: Dimension,
    pub customers: Dimension,
    pub products: Dimension,
    pub facts: Vec<SalesFact>,
}

impl StarSchema {
    pub fn dimensions(&self) -> [&Dimension; 3] {
        [&self.branches, &self.customers, &self.products]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductLineSales {
    pub branch: String,
    pub product_line: String,
    pub total_sales: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySales {
    pub branch: String,
    pub month: String,
    pub total_sales: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductLineRating {
    pub branch: String,
    pub product_line: String,
    pub average_rating: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub records: usize,
    pub branches: usize,
    pub customers: usize,
    pub products: usize,
    pub database_path: String,
    pub report_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_value_number_equality_is_exact() {
        assert_eq!(KeyValue::Number(74.69), KeyValue::Number(74.69));
        assert_ne!(KeyValue::Number(74.69), KeyValue::Number(74.7));
        assert_ne!(KeyValue::Number(1.0), KeyValue::Text("1".to_string()));
    }

    #[test]
    fn test_dimension_assigns_dense_ids_in_first_seen_order() {
        let mut dim = Dimension::new(
            "branch_dim",
            "branch_id",
            vec![
                ("branch".to_string(), AttributeKind::Text),
                ("city".to_string(), AttributeKind::Text),
            ],
        );
        let a = vec![KeyValue::Text("A".into()), KeyValue::Text("Yangon".into())];
        let c = vec![KeyValue::Text("C".into()), KeyValue::Text("Naypyitaw".into())];

        assert_eq!(dim.get_or_insert(a.clone()), 1);
        assert_eq!(dim.get_or_insert(c.clone()), 2);
        assert_eq!(dim.get_or_insert(a.clone()), 1);
        assert_eq!(dim.len(), 2);
        assert_eq!(dim.lookup(&c), Some(2));
        assert_eq!(dim.row(2).map(|r| &r.values), Some(&c));
        assert!(dim.row(0).is_none());
        assert!(dim.row(3).is_none());
    }

    #[test]
    fn test_attribute_lookup_by_name() {
        let record = RawSalesRecord {
            invoice_id: "750-67-8428".into(),
            branch: "A".into(),
            city: "Yangon".into(),
            customer_type: "Member".into(),
            gender: "Female".into(),
            product_line: "Health and beauty".into(),
            unit_price: 74.69,
            quantity: 7,
            tax_amount: 26.1415,
            sales: 548.9715,
            date: "1/5/2019".into(),
            time: "1:08:00 PM".into(),
            payment_mode: "Ewallet".into(),
            cogs: 522.83,
            gross_margin_percentage: 4.761904762,
            gross_income: 26.1415,
            rating: 9.1,
        };

        assert_eq!(record.attribute("city"), Some(KeyValue::Text("Yangon".into())));
        assert_eq!(record.attribute("unit_price"), Some(KeyValue::Number(74.69)));
        assert_eq!(record.attribute("quantity"), Some(KeyValue::Number(7.0)));
        assert_eq!(record.attribute("store"), None);
        assert_eq!(
            RawSalesRecord::attribute_kind("unit_price"),
            Some(AttributeKind::Number)
        );
    }
}
