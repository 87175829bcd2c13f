//! Client-side shopping cart.
//!
//! The cart is not persisted; it is the shape a client keeps between
//! product pages and checkout, and it turns into [`CartLine`]s when an
//! order is placed.

use common::{ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::money::Money;
use crate::order::CartLine;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: ProductId,
    pub name: String,
    pub price: Money,
    pub image: Option<String>,
    /// Stock level seen when the item was added.
    pub stock: u32,
    pub quantity: u32,
    pub vendor: UserId,
}

impl CartItem {
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product: product.id,
            name: product.name.clone(),
            price: product.price,
            image: product.thumbnail().map(str::to_string),
            stock: product.stock,
            quantity,
            vendor: product.vendor,
        }
    }

    pub fn subtotal(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Adds an item, merging with an existing line for the same product.
    ///
    /// The resulting quantity never exceeds the stock seen on the newest copy.
    /// Adding a product that is out of stock does nothing.
    pub fn add(&mut self, item: CartItem) {
        if item.stock == 0 || item.quantity == 0 {
            return;
        }
        match self.items.iter_mut().find(|i| i.product == item.product) {
            Some(existing) => {
                let quantity = existing.quantity.saturating_add(item.quantity);
                *existing = CartItem {
                    quantity: quantity.min(item.stock),
                    ..item
                };
            }
            None => {
                let quantity = item.quantity.min(item.stock);
                self.items.push(CartItem { quantity, ..item });
            }
        }
    }

    /// Sets a line's quantity, clamped to `1..=stock`. Returns false if the
    /// product is not in the cart.
    pub fn set_quantity(&mut self, product: ProductId, quantity: u32) -> bool {
        match self.items.iter_mut().find(|i| i.product == product) {
            Some(item) => {
                item.quantity = quantity.clamp(1, item.stock.max(1));
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, product: ProductId) {
        self.items.retain(|i| i.product != product);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of price * quantity over every line.
    pub fn items_price(&self) -> Money {
        self.items.iter().map(CartItem::subtotal).sum()
    }

    pub fn to_lines(&self) -> Vec<CartLine> {
        self.items
            .iter()
            .map(|i| CartLine::new(i.product, i.quantity))
            .collect()
    }
}
