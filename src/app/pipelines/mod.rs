pub mod check_pipeline;
