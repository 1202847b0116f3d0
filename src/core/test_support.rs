use crate::domain::model::RawSalesRecord;

pub(crate) fn record(
    invoice_id: &str,
    branch: &str,
    city: &str,
    customer_type: &str,
    gender: &str,
    product_line: &str,
    unit_price: f64,
) -> RawSalesRecord {
    let quantity = 2;
    let cogs = unit_price * quantity as f64;
    let tax_amount = cogs * 0.05;
    RawSalesRecord {
        invoice_id: invoice_id.to_string(),
        branch: branch.to_string(),
        city: city.to_string(),
        customer_type: customer_type.to_string(),
        gender: gender.to_string(),
        product_line: product_line.to_string(),
        unit_price,
        quantity,
        tax_amount,
        sales: cogs + tax_amount,
        date: "1/5/2019".to_string(),
        time: "1:08:00 PM".to_string(),
        payment_mode: "Cash".to_string(),
        cogs,
        gross_margin_percentage: 4.761904762,
        gross_income: tax_amount,
        rating: 7.0,
    }
}

pub(crate) fn sample_records() -> Vec<RawSalesRecord> {
    vec![
        record("750-67-8428", "A", "Yangon", "Member", "Female", "Health and beauty", 74.69),
        record("226-31-3081", "C", "Naypyitaw", "Normal", "Female", "Electronic accessories", 15.28),
        record("631-41-3108", "A", "Yangon", "Normal", "Male", "Home and lifestyle", 46.33),
        record("123-19-1176", "A", "Yangon", "Member", "Male", "Health and beauty", 58.22),
        record("373-73-7910", "A", "Yangon", "Normal", "Male", "Sports and travel", 86.31),
        record("699-14-3026", "C", "Naypyitaw", "Normal", "Male", "Electronic accessories", 85.39),
        record("355-53-5943", "A", "Yangon", "Member", "Female", "Electronic accessories", 68.84),
        record("315-22-5665", "C", "Naypyitaw", "Normal", "Female", "Home and lifestyle", 73.56),
        record("665-32-9167", "A", "Yangon", "Member", "Female", "Health and beauty", 36.26),
        record("692-92-5582", "B", "Mandalay", "Member", "Female", "Food and beverages", 54.84),
        record("351-62-0822", "B", "Mandalay", "Member", "Female", "Fashion accessories", 14.48),
        record("529-56-3974", "B", "Mandalay", "Member", "Male", "Electronic accessories", 25.51),
        record("365-64-0515", "A", "Yangon", "Normal", "Female", "Electronic accessories", 46.95),
        record("252-56-2699", "A", "Yangon", "Normal", "Male", "Food and beverages", 43.19),
        record("829-34-3910", "A", "Yangon", "Normal", "Female", "Health and beauty", 71.38),
    ]
}
