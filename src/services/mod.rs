// Tenancy and catalogue
pub mod products;
pub mod tenants;

// Materials and the stock ledger
pub mod inventory_adjustment_service;
pub mod materials;
pub mod stock_alerts;

// Bill of materials
pub mod bom;
pub mod bom_calculator;
pub mod recipes;

// Reporting
pub mod analytics;

// Shared request validation rules
pub mod validators;
