pub mod contract;
pub mod report;
pub mod research;
pub mod sales;
