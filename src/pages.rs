//! Terminal pages: each visit renders text and may redirect elsewhere.
//!
//! Form pages gather input through a [`Prompter`], validate it, and only then
//! talk to the backend. The `submit_*` functions are the part after input
//! gathering, shared with the one-shot subcommands.

use crate::api::{Product, Transport};
use crate::auth::AuthContext;
use crate::forms::{LoginForm, ProductForm, RegisterForm};
use crate::routes::Route;
use anyhow::Result;
use std::fmt::Write as _;

pub const APP_TITLE: &str = "Stock System";

/// Source of form input.
pub trait Prompter {
    /// Ask for one field, offering `initial` as editable starting text.
    fn ask(&mut self, label: &str, initial: &str) -> Result<String>;
}

/// Outcome of visiting a page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Screen {
    pub body: String,
    pub error: Option<String>,
    pub redirect: Option<Route>,
}

impl Screen {
    fn text(body: String) -> Self {
        Self {
            body,
            ..Default::default()
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    fn redirect(route: Route) -> Self {
        Self {
            redirect: Some(route),
            ..Default::default()
        }
    }
}

/// Format a currency amount, e.g. `BRL 1234.50`.
pub fn format_price(amount: f64, currency: &str) -> String {
    format!("{} {:.2}", currency, amount)
}

pub struct Pages<'a, T: Transport> {
    auth: &'a mut AuthContext<T>,
    currency: &'a str,
}

impl<'a, T: Transport> Pages<'a, T> {
    pub fn new(auth: &'a mut AuthContext<T>, currency: &'a str) -> Self {
        Self { auth, currency }
    }

    /// Visit `route`, applying the authentication guard first.
    pub fn visit(&mut self, route: Route, prompter: &mut dyn Prompter) -> Result<Screen> {
        let landed = route.guard(self.auth.is_authenticated());
        if landed != route {
            tracing::debug!(from = %route, to = %landed, "redirecting unauthenticated visit");
            return Ok(Screen::redirect(landed));
        }

        match route {
            Route::Login => self.login_page(prompter),
            Route::Register => self.register_page(prompter),
            Route::Products => Ok(self.products_page()),
            Route::ProductDetail(id) => Ok(self.detail_page(id)),
            Route::NewProduct => self.product_form_page(None, prompter),
            Route::EditProduct(id) => self.product_form_page(Some(id), prompter),
        }
    }

    fn login_page(&mut self, prompter: &mut dyn Prompter) -> Result<Screen> {
        let form = LoginForm {
            email: prompter.ask("Email", "")?,
            password: prompter.ask("Password", "")?,
        };
        Ok(self.submit_login(&form))
    }

    pub fn submit_login(&mut self, form: &LoginForm) -> Screen {
        if let Err(e) = form.validate() {
            return Screen::error(e.to_string());
        }
        if self.auth.login(&form.email, &form.password) {
            Screen::redirect(Route::Products)
        } else {
            Screen::error("Invalid credentials")
        }
    }

    fn register_page(&mut self, prompter: &mut dyn Prompter) -> Result<Screen> {
        let form = RegisterForm {
            name: prompter.ask("Full name", "")?,
            email: prompter.ask("Email", "")?,
            password: prompter.ask("Password", "")?,
            confirm_password: prompter.ask("Confirm password", "")?,
        };
        Ok(self.submit_register(&form))
    }

    pub fn submit_register(&mut self, form: &RegisterForm) -> Screen {
        if let Err(e) = form.validate() {
            return Screen::error(e.to_string());
        }
        if self.auth.register(&form.name, &form.email, &form.password) {
            Screen::redirect(Route::Products)
        } else {
            Screen::error("Failed to create account. Try again.")
        }
    }

    fn header(&self) -> String {
        let name = self.auth.user().map(|u| u.name.as_str()).unwrap_or("");
        format!("{} | Hello, {}\n\n", APP_TITLE, name)
    }

    fn products_page(&self) -> Screen {
        let products = self.auth.api().list_products();
        let mut out = self.header();

        if products.is_empty() {
            out.push_str("No products found\n");
            out.push_str("Start by adding your first product: /products/new\n");
            return Screen::text(out);
        }

        let _ = writeln!(out, "Products ({})", products.len());
        let _ = writeln!(
            out,
            "{:>6}  {:<28} {:>14} {:>7}  {}",
            "ID", "NAME", "PRICE", "STOCK", "STATUS"
        );
        for p in &products {
            let _ = writeln!(
                out,
                "{:>6}  {:<28} {:>14} {:>7}  {}",
                p.id,
                truncate(&p.name, 28),
                format_price(p.price, self.currency),
                p.stock_quantity,
                p.stock_level().label()
            );
            if let Some(desc) = &p.description {
                let _ = writeln!(out, "{:>6}  {}", "", truncate(desc, 60));
            }
        }
        Screen::text(out)
    }

    pub fn find_product(&self, id: u64) -> Option<Product> {
        self.auth
            .api()
            .list_products()
            .into_iter()
            .find(|p| p.id == id)
    }

    fn detail_page(&self, id: u64) -> Screen {
        let Some(p) = self.find_product(id) else {
            return Screen {
                body: format!("{}Back to products: /products\n", self.header()),
                error: Some("Product not found".to_string()),
                redirect: None,
            };
        };

        let mut out = self.header();
        let _ = writeln!(out, "{}  [{}]", p.name, p.stock_level().label());
        if let Some(desc) = &p.description {
            let _ = writeln!(out, "{}", desc);
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Price:              {}", format_price(p.price, self.currency));
        let _ = writeln!(
            out,
            "Total stock value:  {}",
            format_price(p.stock_value(), self.currency)
        );
        let _ = writeln!(out, "Available quantity: {} units", p.stock_quantity);
        let _ = writeln!(out, "Product ID:         {}", p.id);
        let _ = writeln!(out);
        let _ = writeln!(out, "Edit: {}", Route::EditProduct(p.id));
        let _ = writeln!(out, "New:  {}", Route::NewProduct);
        let _ = writeln!(out, "All:  {}", Route::Products);
        Screen::text(out)
    }

    fn product_form_page(
        &mut self,
        editing: Option<u64>,
        prompter: &mut dyn Prompter,
    ) -> Result<Screen> {
        let initial = match editing {
            Some(id) => match self.find_product(id) {
                Some(p) => ProductForm::from_fields(&p.fields()),
                None => {
                    return Ok(Screen {
                        error: Some("Product not found".to_string()),
                        redirect: Some(Route::Products),
                        ..Default::default()
                    })
                }
            },
            None => ProductForm::default(),
        };

        let form = ProductForm {
            name: prompter.ask("Name", &initial.name)?,
            description: prompter.ask("Description", &initial.description)?,
            price: prompter.ask("Price", &initial.price)?,
            stock_quantity: prompter.ask("Stock quantity", &initial.stock_quantity)?,
        };
        Ok(self.submit_product(editing, &form))
    }

    pub fn submit_product(&mut self, editing: Option<u64>, form: &ProductForm) -> Screen {
        let fields = match form.validate() {
            Ok(fields) => fields,
            Err(e) => return Screen::error(e.to_string()),
        };

        let api = self.auth.api();
        let result = match editing {
            Some(id) => api.update_product(id, &fields),
            None => api.create_product(&fields),
        };

        match result {
            Ok(_) => Screen::redirect(Route::Products),
            Err(e) => {
                tracing::warn!(error = %e, "product submit failed");
                Screen::error(if editing.is_some() {
                    "Failed to update product. Try again."
                } else {
                    "Failed to create product. Try again."
                })
            }
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
