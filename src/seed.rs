//! Fixed sample listings shown ahead of everything published through moderation.

use chrono::{TimeZone, Utc};

use crate::models::*;

struct SeedRow {
    id: &'static str,
    title: &'static str,
    description: &'static str,
    price: u32,
    category: Category,
    item_type: &'static str,
    size: &'static str,
    condition: Condition,
    image: &'static str,
    seller: (&'static str, &'static str, f32),
    tags: [&'static str; 3],
    location: &'static str,
    posted_day: u32,
    upvotes: u32,
    views: u64,
}

const UNSPLASH: &str = "https://images.unsplash.com/";

const ROWS: [SeedRow; 12] = [
    SeedRow {
        id: "1",
        title: "Vintage Denim Jacket",
        description: "Classic blue denim jacket from the 90s. Perfect condition with minimal wear.",
        price: 45,
        category: Category::Outerwear,
        item_type: "Jacket",
        size: "M",
        condition: Condition::LikeNew,
        image: "photo-1551028719-00167b16eac5",
        seller: ("Sarah M.", "photo-1494790108755-2616b612b786", 4.8),
        tags: ["vintage", "denim", "casual"],
        location: "New York, NY",
        posted_day: 15,
        upvotes: 24,
        views: 156,
    },
    SeedRow {
        id: "2",
        title: "Designer Summer Dress",
        description: "Beautiful floral summer dress, worn only once to a wedding. Size 8.",
        price: 85,
        category: Category::Dresses,
        item_type: "Summer Dress",
        size: "M",
        condition: Condition::New,
        image: "photo-1515372039744-b8f02a3ae446",
        seller: ("Emma K.", "photo-1438761681033-6461ffad8d80", 4.9),
        tags: ["designer", "floral", "summer"],
        location: "Los Angeles, CA",
        posted_day: 14,
        upvotes: 18,
        views: 89,
    },
    SeedRow {
        id: "3",
        title: "Leather Boots",
        description: "Genuine leather ankle boots in excellent condition. Perfect for fall weather.",
        price: 65,
        category: Category::Footwear,
        item_type: "Boots",
        size: "8",
        condition: Condition::Good,
        image: "photo-1544966503-7cc5ac882d5f",
        seller: ("Mike R.", "photo-1472099645785-5658abf4ff4e", 4.7),
        tags: ["leather", "boots", "fall"],
        location: "Chicago, IL",
        posted_day: 13,
        upvotes: 31,
        views: 203,
    },
    SeedRow {
        id: "4",
        title: "Casual T-Shirt Bundle",
        description: "Set of 3 casual t-shirts in different colors. All in great condition.",
        price: 25,
        category: Category::Tops,
        item_type: "T-shirt",
        size: "L",
        condition: Condition::Good,
        image: "photo-1521572163474-6864f9cf17ab",
        seller: ("Alex J.", "photo-1507003211169-0a1dd7228f2d", 4.6),
        tags: ["casual", "bundle", "basic"],
        location: "Miami, FL",
        posted_day: 12,
        upvotes: 12,
        views: 67,
    },
    SeedRow {
        id: "5",
        title: "Wool Winter Coat",
        description: "Elegant black wool coat, perfect for winter. Rarely worn, excellent condition.",
        price: 120,
        category: Category::Outerwear,
        item_type: "Coat",
        size: "S",
        condition: Condition::LikeNew,
        image: "photo-1539533113208-f6df8cc8b543",
        seller: ("Lisa C.", "photo-1491349174775-aaafddd81942", 4.9),
        tags: ["winter", "wool", "elegant"],
        location: "Boston, MA",
        posted_day: 11,
        upvotes: 35,
        views: 298,
    },
    SeedRow {
        id: "6",
        title: "Running Sneakers",
        description: "Nike Air Max sneakers in great condition. Used for light jogging only.",
        price: 55,
        category: Category::Footwear,
        item_type: "Sneakers",
        size: "9",
        condition: Condition::Good,
        image: "photo-1542291026-7eec264c27ff",
        seller: ("Tom H.", "photo-1500648767791-00dcc994a43e", 4.5),
        tags: ["nike", "running", "athletic"],
        location: "Austin, TX",
        posted_day: 10,
        upvotes: 19,
        views: 142,
    },
    SeedRow {
        id: "7",
        title: "Silk Blouse",
        description: "Professional silk blouse in cream color. Perfect for office wear.",
        price: 40,
        category: Category::Tops,
        item_type: "Blouse",
        size: "M",
        condition: Condition::LikeNew,
        image: "photo-1564257577154-75f6b77ac595",
        seller: ("Rachel P.", "photo-1502823403499-6ccfcf4fb453", 4.8),
        tags: ["silk", "professional", "cream"],
        location: "Seattle, WA",
        posted_day: 9,
        upvotes: 22,
        views: 178,
    },
    SeedRow {
        id: "8",
        title: "Denim Jeans",
        description: "High-waisted skinny jeans from Zara. Size 28, excellent fit.",
        price: 35,
        category: Category::Bottoms,
        item_type: "Jeans",
        size: "28",
        condition: Condition::Good,
        image: "photo-1541099649105-f69ad21f3246",
        seller: ("Maya S.", "photo-1517841905240-472988babdf9", 4.7),
        tags: ["zara", "skinny", "high-waisted"],
        location: "Portland, OR",
        posted_day: 8,
        upvotes: 16,
        views: 134,
    },
    SeedRow {
        id: "9",
        title: "Cashmere Sweater",
        description: "Luxurious beige cashmere sweater. Soft and warm, perfect for winter.",
        price: 95,
        category: Category::Tops,
        item_type: "Sweater",
        size: "L",
        condition: Condition::LikeNew,
        image: "photo-1578662996442-48f60103fc96",
        seller: ("David L.", "photo-1519085360753-af0119f7cbe7", 4.6),
        tags: ["cashmere", "luxury", "winter"],
        location: "Denver, CO",
        posted_day: 7,
        upvotes: 28,
        views: 221,
    },
    SeedRow {
        id: "10",
        title: "Evening Gown",
        description: "Stunning black evening gown worn once to a gala. Size 6, floor length.",
        price: 150,
        category: Category::Dresses,
        item_type: "Evening",
        size: "S",
        condition: Condition::LikeNew,
        image: "photo-1566479179817-b40b28aedc7c",
        seller: ("Anna B.", "photo-1544005313-94ddf0286df2", 4.9),
        tags: ["formal", "gala", "elegant"],
        location: "San Francisco, CA",
        posted_day: 6,
        upvotes: 42,
        views: 367,
    },
    SeedRow {
        id: "11",
        title: "Leather Handbag",
        description: "Genuine leather crossbody bag in brown. Multiple compartments, very practical.",
        price: 75,
        category: Category::Accessories,
        item_type: "Handbag",
        size: "One Size",
        condition: Condition::Good,
        image: "photo-1553062407-98eeb64c6a62",
        seller: ("Sophie M.", "photo-1487412720507-e7ab37603c6f", 4.8),
        tags: ["leather", "crossbody", "practical"],
        location: "Nashville, TN",
        posted_day: 5,
        upvotes: 20,
        views: 189,
    },
    SeedRow {
        id: "12",
        title: "Sports Jacket",
        description: "Navy blue blazer perfect for business casual. Tailored fit, barely worn.",
        price: 80,
        category: Category::Outerwear,
        item_type: "Blazer",
        size: "M",
        condition: Condition::LikeNew,
        image: "photo-1507003211169-0a1dd7228f2d",
        seller: ("James W.", "photo-1472099645785-5658abf4ff4e", 4.7),
        tags: ["business", "navy", "tailored"],
        location: "Atlanta, GA",
        posted_day: 4,
        upvotes: 25,
        views: 156,
    },
];

impl SeedRow {
    fn to_item(&self) -> CatalogItem {
        let (seller_name, avatar, rating) = self.seller;
        CatalogItem {
            id: self.id.to_string(),
            title: self.title.to_string(),
            description: self.description.to_string(),
            price: self.price,
            category: self.category,
            item_type: self.item_type.to_string(),
            size: self.size.to_string(),
            condition: self.condition,
            color: String::new(),
            brand: String::new(),
            location: self.location.to_string(),
            tags: self.tags.iter().map(|t| t.to_string()).collect(),
            images: vec![ImageRef(format!("{UNSPLASH}{}?w=400&h=400&fit=crop", self.image))],
            seller: Seller {
                name: seller_name.to_string(),
                contact: String::new(),
                avatar: Some(format!("{UNSPLASH}{avatar}?w=150&h=150&fit=crop&crop=face")),
                rating: Some(rating),
            },
            posted_at: Utc
                .with_ymd_and_hms(2024, 1, self.posted_day, 0, 0, 0)
                .single()
                .unwrap_or_default(),
            upvotes: self.upvotes,
            // sample votes predate voter attribution
            upvoted_by: (1..=self.upvotes).map(|n| format!("anonymous-{n}")).collect(),
            views: self.views,
        }
    }
}

/// The twelve sample listings, newest first.
pub fn catalog() -> Vec<CatalogItem> {
    ROWS.iter().map(SeedRow::to_item).collect()
}
