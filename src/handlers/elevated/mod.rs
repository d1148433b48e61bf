// handlers/elevated/mod.rs - routes behind the admin role check
//
// Route prefix: /api/v1/admin/*
// Middleware: jwt_auth_middleware, then require_admin_middleware

pub mod admin;
