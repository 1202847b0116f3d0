use crate::domain::model::{
    AttributeKind, DatedSalesRecord, Dimension, DimensionSpec, KeyValue, RawSalesRecord,
    SalesFact, StarSchema,
};
use crate::utils::error::{EtlError, Result};
use chrono::NaiveDateTime;
use std::collections::HashSet;

/// `date` + `time` as they appear in the extract, e.g. "1/5/2019 1:08:00 PM".
pub const INPUT_DATETIME_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

/// 將扁平記錄轉為星狀綱要：三個維度表加一個事實表
pub fn normalize(records: Vec<RawSalesRecord>, specs: &[DimensionSpec; 3]) -> Result<StarSchema> {
    ensure_unique_invoices(&records)?;

    let [branch_spec, customer_spec, product_spec] = specs;
    let branches = build_dimension(&records, branch_spec)?;
    let customers = build_dimension(&records, customer_spec)?;
    let products = build_dimension(&records, product_spec)?;

    let dated = records
        .into_iter()
        .map(attach_datetime)
        .collect::<Result<Vec<_>>>()?;

    let facts = build_fact(&dated, &branches, &customers, &products)?;

    tracing::info!(
        "⭐ Star schema built: {} branches, {} customers, {} products, {} facts",
        branches.len(),
        customers.len(),
        products.len(),
        facts.len()
    );

    Ok(StarSchema {
        branches,
        customers,
        products,
        facts,
    })
}

/// Projects the records onto the natural key and numbers each distinct tuple
/// from 1 in first-occurrence order.
pub fn build_dimension(records: &[RawSalesRecord], spec: &DimensionSpec) -> Result<Dimension> {
    let columns = resolve_key_columns(spec)?;
    let mut dimension = Dimension::new(&spec.table, &spec.id_column, columns);

    for record in records {
        let key = natural_key(record, spec.key_attributes.iter().map(String::as_str))?;
        dimension.get_or_insert(key);
    }

    tracing::debug!(
        "Built {} with {} rows from {} records (key: {})",
        spec.table,
        dimension.len(),
        records.len(),
        spec.key_attributes.join(", ")
    );
    Ok(dimension)
}

/// 合併 date 與 time 為單一時間戳記，格式不符即中止整批
pub fn attach_datetime(record: RawSalesRecord) -> Result<DatedSalesRecord> {
    let invoice_datetime =
        parse_invoice_datetime(&record.date, &record.time).map_err(|e| EtlError::ParseError {
            invoice_id: record.invoice_id.clone(),
            field: "date/time".to_string(),
            value: format!("{} {}", record.date, record.time),
            reason: e.to_string(),
        })?;

    Ok(DatedSalesRecord {
        record,
        invoice_datetime,
    })
}

pub fn parse_invoice_datetime(
    date: &str,
    time: &str,
) -> std::result::Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(
        &format!("{} {}", date.trim(), time.trim()),
        INPUT_DATETIME_FORMAT,
    )
}

/// Resolves every record's natural keys against the dimensions. One fact per
/// record; an unresolved key means the dimensions were not built from these
/// records.
pub fn build_fact(
    records: &[DatedSalesRecord],
    branches: &Dimension,
    customers: &Dimension,
    products: &Dimension,
) -> Result<Vec<SalesFact>> {
    records
        .iter()
        .map(|dated| {
            let record = &dated.record;
            Ok(SalesFact {
                invoice_id: record.invoice_id.clone(),
                branch_id: resolve_surrogate(branches, record)?,
                customer_id: resolve_surrogate(customers, record)?,
                product_id: resolve_surrogate(products, record)?,
                quantity: record.quantity,
                cogs: record.cogs,
                tax_amount: record.tax_amount,
                sales: record.sales,
                gross_income: record.gross_income,
                gross_margin_percentage: record.gross_margin_percentage,
                invoice_datetime: dated.invoice_datetime,
                payment_mode: record.payment_mode.clone(),
                rating: record.rating,
            })
        })
        .collect()
}

fn resolve_key_columns(spec: &DimensionSpec) -> Result<Vec<(String, AttributeKind)>> {
    if spec.key_attributes.is_empty() {
        return Err(EtlError::ConfigValidationError {
            field: spec.table.clone(),
            message: "natural key needs at least one attribute".to_string(),
        });
    }

    let mut columns = Vec::with_capacity(spec.key_attributes.len());
    let mut missing = Vec::new();
    for name in &spec.key_attributes {
        match RawSalesRecord::attribute_kind(name) {
            Some(kind) => columns.push((name.clone(), kind)),
            None => missing.push(name.clone()),
        }
    }

    if !missing.is_empty() {
        return Err(EtlError::SchemaError { missing });
    }
    Ok(columns)
}

fn natural_key<'a>(
    record: &RawSalesRecord,
    attributes: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<KeyValue>> {
    attributes
        .into_iter()
        .map(|name| {
            record.attribute(name).ok_or_else(|| EtlError::SchemaError {
                missing: vec![name.to_string()],
            })
        })
        .collect()
}

fn resolve_surrogate(dimension: &Dimension, record: &RawSalesRecord) -> Result<i64> {
    let key = natural_key(record, dimension.key_attributes())?;
    dimension
        .lookup(&key)
        .ok_or_else(|| EtlError::ConsistencyError {
            dimension: dimension.table.clone(),
            key: key
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        })
}

fn ensure_unique_invoices(records: &[RawSalesRecord]) -> Result<()> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.invoice_id.as_str()) {
            return Err(EtlError::ValidationError {
                message: format!("duplicate invoice_id {}", record.invoice_id),
            });
        }
    }
    Ok(())
}
