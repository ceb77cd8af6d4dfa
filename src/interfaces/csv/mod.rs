pub mod event_reader;
pub mod installment_writer;
pub mod plan_reader;
pub mod report_writer;
