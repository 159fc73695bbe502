//! Stock adjustment command.

use circuit_sphere_core::KitId;

/// Add `delta` units to a kit's stock.
///
/// # Errors
///
/// Returns an error if the kit does not exist or the stock would go negative.
pub async fn adjust(kit: i32, delta: i32) -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;
    let catalog = super::catalog(pool.clone());

    let kit = catalog.adjust_stock(KitId::new(kit), delta).await?;
    tracing::info!(
        kit_id = %kit.id,
        name = %kit.name,
        stock = kit.stock_quantity,
        "Stock adjusted"
    );

    pool.close().await;
    Ok(())
}
