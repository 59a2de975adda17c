pub mod admin;
pub mod appointment;
pub mod booking;
pub mod client;
pub mod consent_form;
pub mod promotion;
pub mod service;

pub use admin::{AdminUser, LoginRequest};
pub use appointment::{
    Appointment, AppointmentDateTime, AppointmentDetail, AppointmentStatus, DayStatus, NewSlot,
    ScheduledAppointment, SlotView,
};
pub use booking::{BookingConfirmation, BookingRequest, ScheduledAppointmentRequest};
pub use client::{Client, ClientInfo};
pub use consent_form::{ConsentForm, ConsentFormRequest, ConsentFormStatement, StatementInput};
pub use promotion::{Promotion, PromotionRef};
pub use service::{Service, ServiceType};
