//! Route table and the authentication guard.

use once_cell::sync::Lazy;
use regex::Regex;

static PRODUCT_ROUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/products/(\d+)(/edit)?$").expect("valid route pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    Products,
    NewProduct,
    ProductDetail(u64),
    EditProduct(u64),
}

impl Route {
    /// Resolve a path. `/` and anything unknown land on `/products`.
    pub fn parse(path: &str) -> Self {
        let path = path.trim();
        let path = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };

        match path {
            "/login" => return Route::Login,
            "/register" => return Route::Register,
            "/products" => return Route::Products,
            "/products/new" => return Route::NewProduct,
            _ => {}
        }

        if let Some(caps) = PRODUCT_ROUTE.captures(path) {
            if let Ok(id) = caps[1].parse::<u64>() {
                return if caps.get(2).is_some() {
                    Route::EditProduct(id)
                } else {
                    Route::ProductDetail(id)
                };
            }
        }

        Route::Products
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Products => "/products".to_string(),
            Route::NewProduct => "/products/new".to_string(),
            Route::ProductDetail(id) => format!("/products/{}", id),
            Route::EditProduct(id) => format!("/products/{}/edit", id),
        }
    }

    pub fn is_protected(&self) -> bool {
        !matches!(self, Route::Login | Route::Register)
    }

    /// Where a visit to `self` actually lands.
    pub fn guard(self, authenticated: bool) -> Self {
        if self.is_protected() && !authenticated {
            Route::Login
        } else {
            self
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}
