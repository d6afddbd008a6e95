pub mod checkout;
pub mod coupons;
pub mod inventory;
pub mod orders;
pub mod payments;
pub mod points;
pub mod returns;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::events::EventSender;
use crate::services::cart::CartService;
use crate::services::catalog::CatalogService;
use crate::services::checkout::CheckoutService;
use crate::services::coupons::CouponService;
use crate::services::orders::OrderService;
use crate::services::payments::PaymentService;
use crate::services::points::PointsService;
use crate::services::stock::StockService;

pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: CatalogService,
    pub cart: CartService,
    pub stock: StockService,
    pub coupons: CouponService,
    pub points: PointsService,
    pub checkout: CheckoutService,
    pub payments: PaymentService,
    pub orders: OrderService,
}

impl AppServices {
    /// Wires the full service graph over shared in-memory stores.
    pub fn build(config: &AppConfig, event_sender: Arc<EventSender>) -> Self {
        let stock = StockService::new();
        let catalog = CatalogService::new(stock.clone());
        let cart = CartService::new(catalog.clone());
        let points = PointsService::new();
        let coupons = CouponService::new();
        let checkout = CheckoutService::new(
            cart.clone(),
            stock.clone(),
            event_sender.clone(),
            config.session_ttl_secs,
        );
        let orders = OrderService::new(
            stock.clone(),
            points.clone(),
            coupons.clone(),
            event_sender.clone(),
            config.return_window_days,
        );
        let payments = PaymentService::new(
            checkout.clone(),
            stock.clone(),
            points.clone(),
            coupons.clone(),
            orders.clone(),
            event_sender,
        );
        Self {
            catalog,
            cart,
            stock,
            coupons,
            points,
            checkout,
            payments,
            orders,
        }
    }
}
