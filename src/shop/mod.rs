//! The record types of a small shop: its stock of products and the revenue
//! booked per product, each kept in its own record table.

use std::{cmp::Ordering, path::PathBuf};

use log::debug;

use crate::{
    encoding::{Decode, Encode, FixedStr, RecordReader, RecordWriter},
    error::Error,
    fs::{OsDir, StorageDir},
    table::{RecordTable, TableOptions},
};

pub const PRODUCTS_FILE: &str = "products.bin";
pub const REVENUE_FILE: &str = "revenue.bin";

pub type Text = FixedStr<64>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Product {
    pub name: Text,
    pub manufacturer: Text,
    pub article: i32,
    pub weight: f32,
    pub category: Text,
    /// Stock left, in kg.
    pub availability: f32,
    pub sell_price: f32,
    pub buy_price: f32,
    /// Unix seconds; 0 when the product does not expire.
    pub expiration_time: i64,
}

impl Product {
    pub fn new(name: &str, article: i32) -> anyhow::Result<Self> {
        Ok(Product {
            name: FixedStr::new(name)?,
            article,
            ..Product::default()
        })
    }

    pub fn by_name(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn by_article(&self, article: &i32) -> bool {
        self.article == *article
    }
}

impl Encode for Product {
    const WIDTH: usize = 3 * Text::WIDTH + i32::WIDTH + 4 * f32::WIDTH + i64::WIDTH;

    fn write_bytes(&self, w: &mut RecordWriter) {
        self.name.write_bytes(w);
        self.manufacturer.write_bytes(w);
        self.article.write_bytes(w);
        self.weight.write_bytes(w);
        self.category.write_bytes(w);
        self.availability.write_bytes(w);
        self.sell_price.write_bytes(w);
        self.buy_price.write_bytes(w);
        self.expiration_time.write_bytes(w);
    }
}

impl Decode for Product {
    fn decode(r: &mut RecordReader) -> anyhow::Result<Self> {
        Ok(Product {
            name: Text::decode(r)?,
            manufacturer: Text::decode(r)?,
            article: i32::decode(r)?,
            weight: f32::decode(r)?,
            category: Text::decode(r)?,
            availability: f32::decode(r)?,
            sell_price: f32::decode(r)?,
            buy_price: f32::decode(r)?,
            expiration_time: i64::decode(r)?,
        })
    }
}

/// Sales booked against one product.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Revenue {
    pub name: Text,
    pub article: u32,
    pub weight_bought: f32,
    pub revenue: f32,
}

impl Revenue {
    pub fn by_name(&self, name: &str) -> bool {
        self.name == name
    }

    /// Heaviest sales first.
    pub fn by_weight_desc(a: &Revenue, b: &Revenue) -> Ordering {
        b.weight_bought.total_cmp(&a.weight_bought)
    }

    /// Largest revenue first.
    pub fn by_revenue_desc(a: &Revenue, b: &Revenue) -> Ordering {
        b.revenue.total_cmp(&a.revenue)
    }
}

impl Encode for Revenue {
    const WIDTH: usize = Text::WIDTH + u32::WIDTH + 2 * f32::WIDTH;

    fn write_bytes(&self, w: &mut RecordWriter) {
        self.name.write_bytes(w);
        self.article.write_bytes(w);
        self.weight_bought.write_bytes(w);
        self.revenue.write_bytes(w);
    }
}

impl Decode for Revenue {
    fn decode(r: &mut RecordReader) -> anyhow::Result<Self> {
        Ok(Revenue {
            name: Text::decode(r)?,
            article: u32::decode(r)?,
            weight_bought: f32::decode(r)?,
            revenue: f32::decode(r)?,
        })
    }
}

#[derive(Debug)]
pub struct Shop<D = OsDir>
where
    D: StorageDir,
{
    pub products: RecordTable<Product, D>,
    pub revenue: RecordTable<Revenue, D>,
}

impl Shop<OsDir> {
    pub fn open<P: Into<PathBuf>>(dir: P, options: TableOptions) -> anyhow::Result<Self> {
        Self::open_in(OsDir::new(dir), options)
    }
}

impl<D> Shop<D>
where
    D: StorageDir,
{
    pub fn open_in(dir: D, options: TableOptions) -> anyhow::Result<Self> {
        Ok(Shop {
            products: RecordTable::open_in(dir.clone(), PRODUCTS_FILE, options.clone())?,
            revenue: RecordTable::open_in(dir, REVENUE_FILE, options)?,
        })
    }

    /// Sells `weight` kg of the product called `name`, moving it out of stock
    /// and into that product's revenue row. Returns the sale price.
    pub fn sell(&mut self, name: &str, weight: f32) -> anyhow::Result<f32> {
        let product = self
            .products
            .lookup_mut(name, Product::by_name)
            .ok_or(Error::NotFound)?;
        // Written so that NaN is rejected too.
        if !(weight > 0.0) {
            return Err(Error::InvalidPrecondition("sale weight must be positive").into());
        }
        if weight > product.availability {
            return Err(Error::InvalidPrecondition("sale weight exceeds availability").into());
        }

        let price = weight * product.sell_price;
        product.availability -= weight;
        let row = Revenue {
            name: product.name.clone(),
            // Articles are stored unsigned on the revenue side.
            article: product.article as u32,
            weight_bought: weight,
            revenue: price,
        };

        match self.revenue.lookup_mut(name, Revenue::by_name) {
            Some(existing) => {
                existing.weight_bought += weight;
                existing.revenue += price;
            }
            None => self.revenue.insert(row),
        }
        debug!("sold {} kg of {} for {}", weight, name, price);
        Ok(price)
    }

    /// Flushes both tables, products first. Both are written even if the
    /// first fails; the first error is returned.
    pub fn flush(self) -> anyhow::Result<()> {
        let Shop { products, revenue } = self;
        let products = products.flush();
        let revenue = revenue.flush();
        products.and(revenue)
    }
}
