pub mod member_activity;

pub mod prelude {
    pub use super::member_activity::Entity as MemberActivity;
}
