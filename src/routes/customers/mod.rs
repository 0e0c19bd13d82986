pub mod bookings;
pub mod carts;
pub mod conversations;
pub mod ticket_orders;
pub mod wishlists;
