//! `imageio brands` command implementations

use crate::api::ApiClient;
use crate::error::Result;
use crate::BrandKindArg;
use colored::Colorize;

/// List brands and categories
pub async fn list(server_url: String) -> Result<()> {
    let client = ApiClient::new(server_url)?;
    let brands = client.list_brands().await?;

    if brands.is_empty() {
        println!("No brands found.");
        println!("Run 'imageio brands create <name>' to add one.");
        return Ok(());
    }

    println!(
        "{}",
        format!("{:>6}  {:<9} {:>6} {:>7}  {}", "ID", "KIND", "ITEMS", "IMAGES", "NAME")
            .cyan()
            .bold()
    );
    for brand in &brands {
        println!(
            "{:>6}  {:<9} {:>6} {:>7}  {}",
            brand.id, brand.kind, brand.item_count, brand.image_count, brand.name
        );
    }

    println!();
    println!("Total: {}", brands.len());

    Ok(())
}

/// Create a brand or category
pub async fn create(server_url: String, name: String, kind: BrandKindArg) -> Result<()> {
    let client = ApiClient::new(server_url)?;
    let brand = client.create_brand(&name, kind.as_str()).await?;

    println!(
        "{} Created {} '{}' with id {}",
        "✓".green(),
        brand.kind,
        brand.name,
        brand.id.to_string().bold()
    );

    Ok(())
}

/// Delete a brand with its items and stored images
pub async fn delete(server_url: String, id: i64) -> Result<()> {
    let client = ApiClient::new(server_url)?;
    let deleted = client.delete_brand(id).await?;

    println!(
        "{} Deleted brand {} ({} files removed)",
        "✓".green(),
        deleted.id,
        deleted.files_removed
    );

    Ok(())
}
