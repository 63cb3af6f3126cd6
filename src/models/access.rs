use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    AcademicOffice,
    Lecturer,
    Student,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::AcademicOffice => "academic_office",
            Role::Lecturer => "lecturer",
            Role::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is driving a scheduling session. `user_id` is the lecturer id for
/// lecturers and the student id for students.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub role: Role,
    pub user_id: i64,
}

impl Actor {
    pub fn new(role: Role, user_id: i64) -> Self {
        Self { role, user_id }
    }
}

/// Capability check shared by every role instead of one engine copy per role.
pub trait SchedulePermissions {
    fn may_view_schedule(&self) -> bool;

    fn may_create_schedule(&self, class_id: i64, lecturer_id: i64) -> bool;

    fn may_delete_batch(&self) -> bool;
}

impl SchedulePermissions for Actor {
    fn may_view_schedule(&self) -> bool {
        true
    }

    fn may_create_schedule(&self, _class_id: i64, lecturer_id: i64) -> bool {
        match self.role {
            Role::Admin | Role::AcademicOffice => true,
            Role::Lecturer => self.user_id == lecturer_id,
            Role::Student => false,
        }
    }

    fn may_delete_batch(&self) -> bool {
        matches!(self.role, Role::Admin | Role::AcademicOffice)
    }
}
