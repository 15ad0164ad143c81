//! 宿主侧句柄 API
//!
//! 控制流：建立注册表（显式安装参考引擎或按配置加载原生库） → 初始化引擎 → 创建 [`Isolate`] → 打开 [`HandleScope`]
//! → 打开 [`ContextScope`] → 创建字符串、脚本与值。
//!
//! ```rust
//! use v8core_host::*;
//!
//! # fn main() -> V8Result<()> {
//! reference::install()?;
//! V8::auto_ensures_init()?;
//! let mut isolate = Isolate::create_on_current_thread()?;
//! let scope = HandleScope::new(&mut isolate)?;
//! let ctx = LocalContext::create(&scope);
//! let ctx_scope = ContextScope::new(&scope, ctx);
//!
//! let code = LocalJsString::create(&ctx_scope, "'Hello' + ' World!'")?;
//! let script = LocalScript::compile(&ctx_scope, code)?;
//! let result = script.run(&ctx_scope)?.as_js_string(&ctx_scope)?;
//! assert_eq!(result.to_string(&ctx_scope, WriteOptions::NO_OPTIONS), "Hello World!");
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod isolate;
pub mod platform;
pub mod scope;
pub mod script;
pub mod string;
pub mod v8;
pub mod value;
pub mod write_options;

pub use context::LocalContext;
pub use isolate::{CreateParams, Isolate, IsolateRef};
pub use platform::Platform;
pub use scope::{AsContextScope, AsIsolate, AsIsolateScope, Context, ContextScope, HandleScope, HandleScopeRef};
pub use script::LocalScript;
pub use string::LocalJsString;
pub use v8::V8;
pub use value::{JsValueRef, LocalJsValue};
pub use write_options::WriteOptions;
