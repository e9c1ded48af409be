//! Backend endpoint paths, relative to the configured base URL.

pub const PRODUCTS: &str = "/api/v1/product";
pub const PRODUCT_BY_ID: &str = "/api/v1/product/get-by-id";
pub const PRODUCTS_BY_CATEGORY: &str = "/api/v1/product/get-by-category-id";

pub const LOGIN: &str = "/api/v1/users/login";
pub const ME: &str = "/api/v1/users/me";
pub const LOGOUT: &str = "/api/v1/users/logout";

pub const CARTS: &str = "/api/v1/cart";
pub const CART_CREATE: &str = "/api/v1/cart/create";
pub const CART_ADD_ITEM: &str = "/api/v1/cart/add-item";

/// Name of the cookie the backend sets on login with `set_cookie=true`.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
