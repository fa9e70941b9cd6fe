pub mod inventory_transaction;
pub mod material;
pub mod product;
pub mod recipe;
pub mod recipe_material;
pub mod stock_alert;
pub mod tenant;
