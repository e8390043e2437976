pub mod admin_routes;
pub mod health;
pub mod user_routes;
