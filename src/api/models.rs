//! Wire types exchanged with the inventory backend.

use serde::{Deserialize, Serialize};

/// An inventory item. The id is assigned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: f64,
    pub stock_quantity: u32,
}

impl Product {
    pub fn from_fields(id: u64, fields: ProductFields) -> Self {
        Self {
            id,
            name: fields.name,
            description: fields.description,
            price: fields.price,
            stock_quantity: fields.stock_quantity,
        }
    }

    pub fn stock_level(&self) -> StockLevel {
        StockLevel::of(self.stock_quantity)
    }

    /// Value of the units on hand at the current price.
    pub fn stock_value(&self) -> f64 {
        self.price * f64::from(self.stock_quantity)
    }

    pub fn fields(&self) -> ProductFields {
        ProductFields {
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price,
            stock_quantity: self.stock_quantity,
        }
    }
}

/// Body of a create or update request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFields {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: f64,
    pub stock_quantity: u32,
}

/// Update body for the success-flag backend, which takes the id in the body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate<'a> {
    pub id: u64,
    #[serde(flatten)]
    pub fields: &'a ProductFields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockLevel {
    High,
    Low,
    Out,
}

impl StockLevel {
    pub fn of(quantity: u32) -> Self {
        match quantity {
            0 => Self::Out,
            1..=10 => Self::Low,
            _ => Self::High,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "In stock",
            Self::Low => "Low stock",
            Self::Out => "Out of stock",
        }
    }
}

/// `{success, message}` answer to a mutation.
#[derive(Debug, Deserialize)]
pub struct MutationResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// The backend names the display-name field `nome`.
#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    #[serde(rename = "nome")]
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub user_id: Option<u64>,
}
