// tests/property/main.rs

mod resolution;
