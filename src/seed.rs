//! Demo data: the technician directory and a starter POS catalog.
//!
//! Each table is only filled when it is empty, so running the seeder twice
//! is harmless.

use crate::{
    entities::{product, technician, ProductCategory},
    errors::ServiceError,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, EntityTrait, PaginatorTrait, Set, TransactionTrait,
};
use tracing::info;

struct TechnicianSeed {
    name: &'static str,
    specialty: &'static str,
    contact: &'static str,
}

const TECHNICIANS: [TechnicianSeed; 5] = [
    TechnicianSeed {
        name: "สมชาย ใจดี",
        specialty: "เครื่องปรับอากาศ",
        contact: "somchai@example.com",
    },
    TechnicianSeed {
        name: "สมหญิง เก่งงาน",
        specialty: "คอมพิวเตอร์",
        contact: "somying@example.com",
    },
    TechnicianSeed {
        name: "ประเสริฐ ช่างทอง",
        specialty: "สมาร์ทโฟน/แท็บเล็ต",
        contact: "prasert@example.com",
    },
    TechnicianSeed {
        name: "สายใจ ช่างไฟ",
        specialty: "เครื่องใช้ไฟฟ้า",
        contact: "saijai@example.com",
    },
    TechnicianSeed {
        name: "วิชัย ช่างซ่อม",
        specialty: "อื่นๆ",
        contact: "wichai@example.com",
    },
];

fn catalog() -> Vec<(&'static str, Decimal, ProductCategory, &'static str)> {
    vec![
        (
            "พิซซ่า",
            dec!(99.00),
            ProductCategory::Food,
            "https://cdn.pizzahut.co.th/pizzas-by-size/mixed-deluxe_mde-M-09022024125157.jpg",
        ),
        (
            "ชาเขียว",
            dec!(25.00),
            ProductCategory::Beverage,
            "https://www.nescafe.com/th/sites/default/files/2024-08/Green%20tea.png",
        ),
        (
            "เค้กช็อกโกแลต",
            dec!(80.00),
            ProductCategory::Dessert,
            "https://www.madamemarco.co.th/uploads/products/2015/10/1446091015-84.png",
        ),
    ]
}

/// Rows written by one seeding run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub technicians: usize,
    pub products: usize,
}

pub async fn seed_all<C>(db: &C) -> Result<SeedReport, ServiceError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;
    let technicians = seed_technicians(&txn).await?;
    let products = seed_products(&txn).await?;
    txn.commit().await?;

    info!(technicians, products, "seed data applied");
    Ok(SeedReport {
        technicians,
        products,
    })
}

async fn seed_technicians<C: ConnectionTrait>(db: &C) -> Result<usize, ServiceError> {
    if technician::Entity::find().count(db).await? > 0 {
        info!("technicians already present, skipping");
        return Ok(0);
    }

    for seed in TECHNICIANS.iter() {
        technician::ActiveModel {
            name: Set(seed.name.to_string()),
            specialty: Set(Some(seed.specialty.to_string())),
            contact: Set(Some(seed.contact.to_string())),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(TECHNICIANS.len())
}

async fn seed_products<C: ConnectionTrait>(db: &C) -> Result<usize, ServiceError> {
    if product::Entity::find().count(db).await? > 0 {
        info!("products already present, skipping");
        return Ok(0);
    }

    let products = catalog();
    for (name, price, category, image) in &products {
        product::ActiveModel {
            name: Set(name.to_string()),
            price: Set(*price),
            image: Set(Some(image.to_string())),
            category: Set(*category),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(products.len())
}
