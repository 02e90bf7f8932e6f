pub mod cart_item;
pub mod coupon;
pub mod coupon_usage;
pub mod guest_order_detail;
pub mod inventory_movement;
pub mod legacy_discount;
pub mod order;
pub mod order_item;
pub mod order_shipping_address;
pub mod order_status_history;
pub mod product;
pub mod product_variant;
pub mod shipping_cost;
pub mod stock_opname;
pub mod stock_opname_detail;
pub mod user;
