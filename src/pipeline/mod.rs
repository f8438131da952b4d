pub mod extraction;
pub mod labs; // Lab report parsing: table and flowed-text strategies
