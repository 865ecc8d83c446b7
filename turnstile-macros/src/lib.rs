//! Procedural macros for the Turnstile runtime.
//!
//! - `#[turnstile::main]` runs an `async fn main` on a fresh runtime.
//! - `#[turnstile::test]` does the same for an `async fn` test.
//! - `join!` polls several futures concurrently, in argument order, on the
//!   current task.

mod utils;

use proc_macro::TokenStream;

/// Builds the `RuntimeBuilder` expression for the given attribute options.
fn runtime_builder(attr: TokenStream) -> Result<String, String> {
    let mut builder = String::from("::turnstile::RuntimeBuilder::new()");

    for (key, value) in utils::parse_options(attr)? {
        match key.as_str() {
            "event_interval" | "stall_detection" => {
                builder.push_str(&format!(".{key}({value})"));
            }
            other => return Err(format!("unknown runtime option `{other}`")),
        }
    }

    builder.push_str(".build()");
    Ok(builder)
}

/// Awaits every argument concurrently and yields their outputs as a tuple.
///
/// All branches are polled in argument order each time the task is woken.
/// Branches that finished early keep their output until the last one is done.
#[proc_macro]
pub fn join(input: TokenStream) -> TokenStream {
    let branches: Vec<String> = utils::split_args(input)
        .iter()
        .map(|tokens| utils::tokens_to_string(tokens))
        .collect();

    if branches.is_empty() {
        return "()".parse().unwrap_or_default();
    }

    let slots: String = branches
        .iter()
        .enumerate()
        .map(|(i, expr)| {
            format!(
                "let mut __join_fut{i} = ::std::pin::pin!({expr});\n\
                 let mut __join_out{i} = ::core::option::Option::None;\n"
            )
        })
        .collect();

    let polls: String = (0..branches.len())
        .map(|i| {
            format!(
                "if __join_out{i}.is_none() {{\n\
                     if let ::std::task::Poll::Ready(out) = \
                         ::std::future::Future::poll(__join_fut{i}.as_mut(), cx) {{\n\
                         __join_out{i} = ::core::option::Option::Some(out);\n\
                     }}\n\
                 }}\n"
            )
        })
        .collect();

    let pending: Vec<String> = (0..branches.len())
        .map(|i| format!("__join_out{i}.is_none()"))
        .collect();

    let outputs: String = (0..branches.len())
        .map(|i| format!("__join_out{i}.take().unwrap(), "))
        .collect();

    let expanded = format!(
        "{{\n{slots}\
         ::std::future::poll_fn(|cx| {{\n\
             {polls}\
             if {any_pending} {{\n\
                 return ::std::task::Poll::Pending;\n\
             }}\n\
             ::std::task::Poll::Ready(({outputs}))\n\
         }}).await\n\
         }}",
        any_pending = pending.join(" || "),
    );

    expanded
        .parse()
        .unwrap_or_else(|err| utils::compile_error(&format!("join! expansion failed: {err}")))
}

#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    let builder = match runtime_builder(attr) {
        Ok(builder) => builder,
        Err(msg) => return utils::compile_error(&msg),
    };

    let rewritten = utils::rewrite_async_fn(item, |body| {
        format!(
            "let runtime = {builder};
            runtime.block_on(async move {{ {body} }})"
        )
    });

    match rewritten {
        Some(tokens) => tokens.into_iter().collect(),
        None => utils::compile_error("#[turnstile::main] expects an `async fn` with a body"),
    }
}

#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let builder = match runtime_builder(attr) {
        Ok(builder) => builder,
        Err(msg) => return utils::compile_error(&msg),
    };

    let rewritten = utils::rewrite_async_fn(item, |body| {
        format!(
            "let runtime = {builder};
            runtime.block_on(async move {{ {body} }})"
        )
    });

    match rewritten {
        Some(tokens) => {
            let mut result: TokenStream = "#[::core::prelude::v1::test]"
                .parse()
                .unwrap_or_default();
            result.extend(tokens);
            result
        }
        None => utils::compile_error("#[turnstile::test] expects an `async fn` with a body"),
    }
}
