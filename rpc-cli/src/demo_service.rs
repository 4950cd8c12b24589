//! The bundled `UserService`, standing in for the schema-compiler-generated
//! service this framework would normally receive from the interface
//! definition. Login/Register match the original framework's worked
//! example (`example/callee/userservice.cc`) closely enough to exercise the
//! provider end to end without pulling in a real user store.

use serde::{Deserialize, Serialize};

use rpc_server::{typed_handler, ServiceRegistry};

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct LoginRequest {
    pub name: String,
    pub pwd: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub errcode: i32,
    pub errmsg: String,
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct RegisterRequest {
    pub id: u32,
    pub name: String,
    pub pwd: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub errcode: i32,
    pub success: bool,
}

pub fn register(registry: &mut ServiceRegistry) {
    registry.register_method(
        "UserService",
        "Login",
        typed_handler(|req: LoginRequest| {
            tracing::info!(name = %req.name, "login attempt");
            LoginResponse {
                errcode: 0,
                errmsg: "Login Success!".to_string(),
                success: false,
            }
        }),
    );

    registry.register_method(
        "UserService",
        "Register",
        typed_handler(|req: RegisterRequest| {
            tracing::info!(id = req.id, name = %req.name, "register attempt");
            RegisterResponse {
                errcode: 0,
                success: true,
            }
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpc_common::codec;

    #[test]
    fn login_handler_round_trips() {
        let mut registry = ServiceRegistry::new();
        register(&mut registry);
        let handler = registry.lookup("UserService", "Login").unwrap();
        let params = codec::encode_payload(&LoginRequest {
            name: "zhang san".into(),
            pwd: "123456".into(),
        })
        .unwrap();
        let raw = handler(&params).unwrap();
        let resp: LoginResponse = codec::decode_payload(&raw).unwrap();
        assert_eq!(resp.errcode, 0);
        assert_eq!(resp.errmsg, "Login Success!");
        assert!(!resp.success);
    }
}
