pub mod sales_pipeline;
