use crate::domain::model::{
    Dimension, KeyValue, MonthlySales, ProductLineRating, ProductLineSales, SalesFact,
    StarSchema, DATETIME_STORAGE_FORMAT,
};
use crate::domain::ports::Warehouse;
use crate::utils::error::Result;
use rusqlite::types::ToSqlOutput;
use rusqlite::{params, Connection, ToSql, Transaction};
use std::path::Path;

pub const FACT_TABLE: &str = "sales_fact";

const TOP_SALES_SQL: &str = "
    WITH ranked AS (
        SELECT
            b.branch AS branch,
            p.product_line AS product_line,
            ROUND(SUM(s.sales), 2) AS total_sales,
            RANK() OVER (
                PARTITION BY b.branch ORDER BY ROUND(SUM(s.sales), 2) DESC
            ) AS sales_rank
        FROM sales_fact s
        JOIN branch_dim b ON b.branch_id = s.branch_id
        JOIN product_dim p ON p.product_id = s.product_id
        GROUP BY b.branch, p.product_line
    )
    SELECT branch, product_line, total_sales
    FROM ranked
    WHERE sales_rank <= ?1
    ORDER BY branch, sales_rank DESC, product_line";

const MONTHLY_SALES_SQL: &str = "
    SELECT
        b.branch,
        strftime('%Y-%m', s.invoice_datetime) AS month,
        ROUND(SUM(s.sales), 2) AS total_sales
    FROM sales_fact s
    JOIN branch_dim b ON b.branch_id = s.branch_id
    GROUP BY b.branch, month
    ORDER BY b.branch, month";

const TOP_RATED_SQL: &str = "
    WITH ranked AS (
        SELECT
            b.branch AS branch,
            p.product_line AS product_line,
            ROUND(AVG(s.rating), 2) AS average_rating,
            RANK() OVER (
                PARTITION BY b.branch ORDER BY ROUND(AVG(s.rating), 2) DESC
            ) AS rating_rank
        FROM sales_fact s
        JOIN branch_dim b ON b.branch_id = s.branch_id
        JOIN product_dim p ON p.product_id = s.product_id
        GROUP BY b.branch, p.product_line
    )
    SELECT branch, product_line, average_rating
    FROM ranked
    WHERE rating_rank <= ?1
    ORDER BY branch, rating_rank DESC, product_line";

impl ToSql for KeyValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            KeyValue::Text(s) => Ok(ToSqlOutput::from(s.as_str())),
            KeyValue::Number(n) => Ok(ToSqlOutput::from(*n)),
        }
    }
}

/// SQLite 星狀綱要倉儲
pub struct SqliteWarehouse {
    conn: Connection,
}

impl SqliteWarehouse {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn row_count(&self, table: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

impl Warehouse for SqliteWarehouse {
    fn replace_star_schema(&mut self, schema: &StarSchema) -> Result<()> {
        // 未 commit 的交易在 drop 時回滾，舊資料表保持不變
        let tx = self.conn.transaction()?;

        tx.execute_batch(&format!("DROP TABLE IF EXISTS {};", quote_ident(FACT_TABLE)))?;
        for dimension in schema.dimensions() {
            replace_dimension(&tx, dimension)?;
        }
        replace_facts(&tx, schema, &schema.facts)?;

        tx.commit()?;
        tracing::info!(
            "💾 Replaced star schema: {} facts, {} / {} / {} dimension rows",
            schema.facts.len(),
            schema.branches.len(),
            schema.customers.len(),
            schema.products.len()
        );
        Ok(())
    }

    fn top_product_lines_by_sales(&self, top_n: usize) -> Result<Vec<ProductLineSales>> {
        let mut stmt = self.conn.prepare(TOP_SALES_SQL)?;
        let rows = stmt
            .query_map(params![top_n as i64], |row| {
                Ok(ProductLineSales {
                    branch: row.get(0)?,
                    product_line: row.get(1)?,
                    total_sales: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn monthly_sales_trend(&self) -> Result<Vec<MonthlySales>> {
        let mut stmt = self.conn.prepare(MONTHLY_SALES_SQL)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(MonthlySales {
                    branch: row.get(0)?,
                    month: row.get(1)?,
                    total_sales: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn top_product_lines_by_rating(&self, top_n: usize) -> Result<Vec<ProductLineRating>> {
        let mut stmt = self.conn.prepare(TOP_RATED_SQL)?;
        let rows = stmt
            .query_map(params![top_n as i64], |row| {
                Ok(ProductLineRating {
                    branch: row.get(0)?,
                    product_line: row.get(1)?,
                    average_rating: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn replace_dimension(tx: &Transaction<'_>, dimension: &Dimension) -> Result<()> {
    let table = quote_ident(&dimension.table);
    let id_column = quote_ident(&dimension.id_column);

    let column_defs: Vec<String> = dimension
        .columns
        .iter()
        .map(|(name, kind)| format!("{} {} NOT NULL", quote_ident(name), kind.sql_type()))
        .collect();
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {table};
         CREATE TABLE {table} ({id_column} INTEGER PRIMARY KEY, {});",
        column_defs.join(", ")
    ))?;

    let column_names: Vec<String> = dimension
        .key_attributes()
        .map(quote_ident)
        .collect();
    let placeholders: Vec<String> = (1..=dimension.columns.len() + 1)
        .map(|i| format!("?{}", i))
        .collect();
    let mut stmt = tx.prepare(&format!(
        "INSERT INTO {table} ({id_column}, {}) VALUES ({})",
        column_names.join(", "),
        placeholders.join(", ")
    ))?;

    for row in dimension.rows() {
        let mut values: Vec<&dyn ToSql> = Vec::with_capacity(row.values.len() + 1);
        values.push(&row.id);
        values.extend(row.values.iter().map(|v| v as &dyn ToSql));
        stmt.execute(values.as_slice())?;
    }

    tracing::debug!("Loaded {} rows into {}", dimension.len(), dimension.table);
    Ok(())
}

fn replace_facts(tx: &Transaction<'_>, schema: &StarSchema, facts: &[SalesFact]) -> Result<()> {
    tx.execute_batch(&format!(
        "CREATE TABLE {fact} (
            invoice_id TEXT PRIMARY KEY,
            branch_id INTEGER NOT NULL REFERENCES {branch}({branch_id}),
            customer_id INTEGER NOT NULL REFERENCES {customer}({customer_id}),
            product_id INTEGER NOT NULL REFERENCES {product}({product_id}),
            quantity INTEGER NOT NULL,
            cogs REAL NOT NULL,
            tax_amount REAL NOT NULL,
            sales REAL NOT NULL,
            gross_income REAL NOT NULL,
            gross_margin_percentage REAL NOT NULL,
            invoice_datetime TEXT NOT NULL,
            payment_mode TEXT NOT NULL,
            rating REAL NOT NULL
        );",
        fact = quote_ident(FACT_TABLE),
        branch = quote_ident(&schema.branches.table),
        branch_id = quote_ident(&schema.branches.id_column),
        customer = quote_ident(&schema.customers.table),
        customer_id = quote_ident(&schema.customers.id_column),
        product = quote_ident(&schema.products.table),
        product_id = quote_ident(&schema.products.id_column),
    ))?;

    let mut stmt = tx.prepare(&format!(
        "INSERT INTO {} (
            invoice_id, branch_id, customer_id, product_id, quantity, cogs, tax_amount,
            sales, gross_income, gross_margin_percentage, invoice_datetime, payment_mode, rating
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        quote_ident(FACT_TABLE)
    ))?;

    for fact in facts {
        stmt.execute(params![
            fact.invoice_id,
            fact.branch_id,
            fact.customer_id,
            fact.product_id,
            fact.quantity,
            fact.cogs,
            fact.tax_amount,
            fact.sales,
            fact.gross_income,
            fact.gross_margin_percentage,
            fact.invoice_datetime
                .format(DATETIME_STORAGE_FORMAT)
                .to_string(),
            fact.payment_mode,
            fact.rating,
        ])?;
    }

    tracing::debug!("Loaded {} rows into {}", facts.len(), FACT_TABLE);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml_config::DimensionKeys;
    use crate::core::normalizer::normalize;
    use crate::core::test_support::{record, sample_records};
    use crate::domain::model::RawSalesRecord;
    use rusqlite::types::Value;

    fn schema_from(records: Vec<RawSalesRecord>) -> StarSchema {
        normalize(records, &DimensionKeys::default().specs()).unwrap()
    }

    fn dump_table(warehouse: &SqliteWarehouse, table: &str) -> Vec<Vec<Value>> {
        let mut stmt = warehouse
            .conn
            .prepare(&format!("SELECT * FROM {} ORDER BY 1", quote_ident(table)))
            .unwrap();
        let columns = stmt.column_count();
        let rows = stmt
            .query_map([], |row| {
                (0..columns)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })
            .unwrap()
            .collect::<rusqlite::Result<Vec<_>>>()
            .unwrap();
        rows
    }

    fn branch_sales(invoice: &str, branch: &str, product_line: &str, sales: f64) -> RawSalesRecord {
        let mut raw = record(invoice, branch, "Yangon", "Member", "Female", product_line, 10.0);
        raw.sales = sales;
        raw
    }

    #[test]
    fn test_replace_writes_all_four_tables() {
        let records = sample_records();
        let schema = schema_from(records.clone());
        let mut warehouse = SqliteWarehouse::open_in_memory().unwrap();

        warehouse.replace_star_schema(&schema).unwrap();

        assert_eq!(warehouse.row_count(FACT_TABLE).unwrap(), records.len());
        assert_eq!(warehouse.row_count("branch_dim").unwrap(), 3);
        assert_eq!(warehouse.row_count("customer_dim").unwrap(), 4);
        assert_eq!(
            warehouse.row_count("product_dim").unwrap(),
            schema.products.len()
        );

        let facts = dump_table(&warehouse, FACT_TABLE);
        let first = facts
            .iter()
            .find(|row| row[0] == Value::Text("750-67-8428".to_string()))
            .unwrap();
        assert_eq!(first[10], Value::Text("2019-01-05 13:08:00".to_string()));
    }

    #[test]
    fn test_replace_twice_yields_identical_tables() {
        let mut warehouse = SqliteWarehouse::open_in_memory().unwrap();

        warehouse
            .replace_star_schema(&schema_from(sample_records()))
            .unwrap();
        let first: Vec<_> = ["branch_dim", "customer_dim", "product_dim", FACT_TABLE]
            .iter()
            .map(|t| dump_table(&warehouse, t))
            .collect();

        warehouse
            .replace_star_schema(&schema_from(sample_records()))
            .unwrap();
        let second: Vec<_> = ["branch_dim", "customer_dim", "product_dim", FACT_TABLE]
            .iter()
            .map(|t| dump_table(&warehouse, t))
            .collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_failed_replace_keeps_previous_tables() {
        let mut warehouse = SqliteWarehouse::open_in_memory().unwrap();
        let schema = schema_from(sample_records());
        warehouse.replace_star_schema(&schema).unwrap();

        let smaller = schema_from(sample_records()[..2].to_vec());
        let mut broken = smaller.clone();
        // duplicate primary key aborts the fact insert
        broken.facts.push(broken.facts[0].clone());

        assert!(warehouse.replace_star_schema(&broken).is_err());
        assert_eq!(
            warehouse.row_count(FACT_TABLE).unwrap(),
            schema.facts.len()
        );
        assert_eq!(warehouse.row_count("branch_dim").unwrap(), 3);
    }

    #[test]
    fn test_top_sales_ties_share_rank() {
        let records = vec![
            branch_sales("1", "A", "Electronics", 500.0),
            branch_sales("2", "A", "Food", 200.0),
            branch_sales("3", "A", "Food", 300.0),
            branch_sales("4", "A", "Toys", 300.0),
            branch_sales("5", "A", "Home", 100.0),
        ];
        let mut warehouse = SqliteWarehouse::open_in_memory().unwrap();
        warehouse.replace_star_schema(&schema_from(records)).unwrap();

        // Electronics 與 Food 同為第 1 名，Toys 第 3 名，Home 第 4 名被排除
        let rows = warehouse.top_product_lines_by_sales(3).unwrap();
        let lines: Vec<(&str, f64)> = rows
            .iter()
            .map(|r| (r.product_line.as_str(), r.total_sales))
            .collect();
        assert_eq!(
            lines,
            vec![("Toys", 300.0), ("Electronics", 500.0), ("Food", 500.0)]
        );
        assert!(rows.iter().all(|r| r.branch == "A"));
    }

    #[test]
    fn test_top_sales_keeps_every_tie_at_cutoff() {
        let records = vec![
            branch_sales("1", "A", "Electronics", 500.0),
            branch_sales("2", "A", "Toys", 300.0),
            branch_sales("3", "A", "Food", 100.0),
            branch_sales("4", "A", "Home", 100.0),
            branch_sales("5", "A", "Garden", 50.0),
        ];
        let mut warehouse = SqliteWarehouse::open_in_memory().unwrap();
        warehouse.replace_star_schema(&schema_from(records)).unwrap();

        let rows = warehouse.top_product_lines_by_sales(3).unwrap();
        let lines: Vec<&str> = rows.iter().map(|r| r.product_line.as_str()).collect();
        assert_eq!(lines, vec!["Food", "Home", "Toys", "Electronics"]);
    }

    #[test]
    fn test_top_sales_branch_with_few_lines_is_not_padded() {
        let records = vec![
            branch_sales("1", "A", "Electronics", 10.0),
            branch_sales("2", "A", "Food", 20.0),
            branch_sales("3", "A", "Toys", 30.0),
            branch_sales("4", "A", "Home", 40.0),
            branch_sales("5", "B", "Food", 55.5),
        ];
        let mut warehouse = SqliteWarehouse::open_in_memory().unwrap();
        warehouse.replace_star_schema(&schema_from(records)).unwrap();

        let rows = warehouse.top_product_lines_by_sales(3).unwrap();
        let a: Vec<&str> = rows
            .iter()
            .filter(|r| r.branch == "A")
            .map(|r| r.product_line.as_str())
            .collect();
        assert_eq!(a, vec!["Food", "Toys", "Home"]);

        let b: Vec<&ProductLineSales> = rows.iter().filter(|r| r.branch == "B").collect();
        assert_eq!(b.len(), 1);
        assert_eq!(b[0].total_sales, 55.5);
    }

    #[test]
    fn test_monthly_sales_trend_groups_by_month() {
        let mut jan = branch_sales("1", "A", "Food", 100.0);
        jan.date = "1/15/2019".to_string();
        let mut jan2 = branch_sales("2", "A", "Toys", 50.25);
        jan2.date = "1/31/2019".to_string();
        let mut mar = branch_sales("3", "A", "Food", 10.0);
        mar.date = "3/2/2019".to_string();

        let mut warehouse = SqliteWarehouse::open_in_memory().unwrap();
        warehouse
            .replace_star_schema(&schema_from(vec![mar, jan, jan2]))
            .unwrap();

        let trend = warehouse.monthly_sales_trend().unwrap();
        assert_eq!(
            trend,
            vec![
                MonthlySales {
                    branch: "A".to_string(),
                    month: "2019-01".to_string(),
                    total_sales: 150.25,
                },
                MonthlySales {
                    branch: "A".to_string(),
                    month: "2019-03".to_string(),
                    total_sales: 10.0,
                },
            ]
        );
    }

    #[test]
    fn test_top_rated_ranks_by_average_rating() {
        let mut records = vec![
            branch_sales("1", "A", "Food", 1.0),
            branch_sales("2", "A", "Food", 1.0),
            branch_sales("3", "A", "Toys", 1.0),
            branch_sales("4", "A", "Home", 1.0),
        ];
        records[0].rating = 9.0;
        records[1].rating = 8.0;
        records[2].rating = 6.0;
        records[3].rating = 8.5;

        let mut warehouse = SqliteWarehouse::open_in_memory().unwrap();
        warehouse.replace_star_schema(&schema_from(records)).unwrap();

        let rows = warehouse.top_product_lines_by_rating(1).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].product_line, "Food");
        assert_eq!(rows[0].average_rating, 8.5);
        assert_eq!(rows[1].product_line, "Home");
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("db").join("sales.db");

        let mut warehouse = SqliteWarehouse::open(&path).unwrap();
        warehouse
            .replace_star_schema(&schema_from(sample_records()))
            .unwrap();

        assert!(path.exists());
    }
}
