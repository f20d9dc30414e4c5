//! Client-side form validation. Runs before any request is sent; the first
//! failing rule is reported.

use crate::api::ProductFields;
use crate::error::FormError;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FormError> {
        if self.email.is_empty() || self.password.is_empty() {
            return Err(FormError::MissingFields);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(), FormError> {
        if self.name.is_empty()
            || self.email.is_empty()
            || self.password.is_empty()
            || self.confirm_password.is_empty()
        {
            return Err(FormError::MissingFields);
        }
        if self.password != self.confirm_password {
            return Err(FormError::PasswordMismatch);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(FormError::PasswordTooShort {
                min: MIN_PASSWORD_LEN,
            });
        }
        Ok(())
    }
}

/// Product form as typed. Numeric fields are kept as text until submit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductForm {
    pub name: String,
    pub description: String,
    pub price: String,
    pub stock_quantity: String,
}

impl ProductForm {
    /// Prefill from an existing product for editing.
    pub fn from_fields(fields: &ProductFields) -> Self {
        Self {
            name: fields.name.clone(),
            description: fields.description.clone().unwrap_or_default(),
            price: fields.price.to_string(),
            stock_quantity: fields.stock_quantity.to_string(),
        }
    }

    /// Validate and convert into a request body. Unparsable numbers read as 0.
    pub fn validate(&self) -> Result<ProductFields, FormError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(FormError::NameRequired);
        }

        let price = parse_number(&self.price);
        if price <= 0.0 {
            return Err(FormError::NonPositivePrice);
        }

        let stock = parse_number(&self.stock_quantity);
        if stock < 0.0 {
            return Err(FormError::NegativeStock);
        }

        let description = self.description.trim();
        Ok(ProductFields {
            name: name.to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
            price,
            stock_quantity: stock.trunc().min(f64::from(u32::MAX)) as u32,
        })
    }
}

fn parse_number(input: &str) -> f64 {
    match input.trim().replace(',', ".").parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => 0.0,
    }
}
