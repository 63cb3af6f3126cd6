pub mod catalog_repository;
pub mod class_repository;
pub mod lesson_repository;
pub mod semester_repository;
