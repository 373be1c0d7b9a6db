//! In-memory transactional store.
//!
//! One mutex guards all four record maps, and every state-transition
//! operation runs inside a single [`Store::transaction`] call: read current
//! status, validate, write new status, write dependent records (coupon
//! counter, enrollment), all under one guard. That single acquisition is
//! what makes the coupon compare-and-increment and the capacity
//! check-then-insert atomic. Transactions must stay fast and local; no
//! network call ever happens inside one.

use cellar_commerce::catalog::Course;
use cellar_commerce::checkout::{Enrollment, Order};
use cellar_commerce::coupon::Coupon;
use cellar_commerce::ids::{CouponId, CourseId, OrderId, UserId};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

/// Store failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Course not found.
    #[error("Course not found: {0}")]
    CourseNotFound(String),

    /// Coupon not found.
    #[error("Coupon not found: {0}")]
    CouponNotFound(String),

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// A previous holder of the store lock panicked.
    #[error("Store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Default)]
struct Inner {
    courses: HashMap<CourseId, Course>,
    coupons: HashMap<CouponId, Coupon>,
    orders: HashMap<OrderId, Order>,
    enrollments: Vec<Enrollment>,
}

/// Shared in-memory store.
#[derive(Debug, Default)]
pub struct Store {
    inner: Mutex<Inner>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` as one atomic unit against the store.
    ///
    /// The closure gets typed accessors over the locked state; everything
    /// it reads and writes is consistent for its whole duration.
    pub fn transaction<T, E>(&self, f: impl FnOnce(&mut Txn<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut guard = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        let mut txn = Txn { inner: &mut guard };
        f(&mut txn)
    }

    /// Insert or replace a course.
    pub fn put_course(&self, course: Course) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        guard.courses.insert(course.id.clone(), course);
        Ok(())
    }

    /// Insert or replace a coupon.
    pub fn put_coupon(&self, coupon: Coupon) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        guard.coupons.insert(coupon.id.clone(), coupon);
        Ok(())
    }

    /// Read a course by id.
    pub fn get_course(&self, id: &CourseId) -> Result<Course, StoreError> {
        let guard = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        guard
            .courses
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::CourseNotFound(id.to_string()))
    }

    /// Read a coupon by id.
    pub fn get_coupon(&self, id: &CouponId) -> Result<Coupon, StoreError> {
        let guard = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        guard
            .coupons
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::CouponNotFound(id.to_string()))
    }

    /// Read an order by id.
    pub fn get_order(&self, id: &OrderId) -> Result<Order, StoreError> {
        let guard = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        guard
            .orders
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::OrderNotFound(id.to_string()))
    }

    /// Read every order a user has placed.
    pub fn orders_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, StoreError> {
        let guard = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(guard
            .orders
            .values()
            .filter(|o| &o.user_id == user_id)
            .cloned()
            .collect())
    }

    /// Read a user's enrollment for a course, if one exists.
    pub fn get_enrollment(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<Enrollment>, StoreError> {
        let guard = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(guard
            .enrollments
            .iter()
            .find(|e| &e.user_id == user_id && &e.course_id == course_id)
            .cloned())
    }
}

/// Typed accessors over locked store state.
pub struct Txn<'a> {
    inner: &'a mut Inner,
}

impl Txn<'_> {
    /// Look up a course.
    pub fn course(&self, id: &CourseId) -> Result<&Course, StoreError> {
        self.inner
            .courses
            .get(id)
            .ok_or_else(|| StoreError::CourseNotFound(id.to_string()))
    }

    /// Look up a coupon by code, case-insensitively.
    pub fn coupon_by_code(&self, code: &str) -> Option<&Coupon> {
        self.inner
            .coupons
            .values()
            .find(|c| c.code.eq_ignore_ascii_case(code))
    }

    /// Look up a coupon for mutation. Returns None when the live record has
    /// been deleted; orders keep their snapshot regardless.
    pub fn coupon_mut(&mut self, id: &CouponId) -> Option<&mut Coupon> {
        self.inner.coupons.get_mut(id)
    }

    /// Look up an order.
    pub fn order(&self, id: &OrderId) -> Result<&Order, StoreError> {
        self.inner
            .orders
            .get(id)
            .ok_or_else(|| StoreError::OrderNotFound(id.to_string()))
    }

    /// Look up an order for mutation.
    pub fn order_mut(&mut self, id: &OrderId) -> Result<&mut Order, StoreError> {
        self.inner
            .orders
            .get_mut(id)
            .ok_or_else(|| StoreError::OrderNotFound(id.to_string()))
    }

    /// Insert a new order.
    pub fn insert_order(&mut self, order: Order) {
        self.inner.orders.insert(order.id.clone(), order);
    }

    /// Whether a (user, course) enrollment already exists.
    pub fn enrollment_exists(&self, user_id: &UserId, course_id: &CourseId) -> bool {
        self.inner
            .enrollments
            .iter()
            .any(|e| &e.user_id == user_id && &e.course_id == course_id)
    }

    /// Confirmed enrollments counted against a course's capacity.
    pub fn confirmed_enrollment_count(&self, course_id: &CourseId) -> u32 {
        self.inner
            .enrollments
            .iter()
            .filter(|e| &e.course_id == course_id)
            .count() as u32
    }

    /// Insert a new enrollment.
    pub fn insert_enrollment(&mut self, enrollment: Enrollment) {
        self.inner.enrollments.push(enrollment);
    }
}
