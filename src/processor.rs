//! Processor Module
//!
//! The expensive operation whose result the facade memoizes.

use serde_json::Value;

/// Computes the value cached under a name.
///
/// Plain closures `Fn(&str) -> Value` implement this directly; richer types
/// implement it by hand.
pub trait Processor {
    fn process(&self, name: &str) -> Value;
}

impl<F> Processor for F
where
    F: Fn(&str) -> Value,
{
    fn process(&self, name: &str) -> Value {
        self(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Greeting {
        prefix: &'static str,
    }

    impl Processor for Greeting {
        fn process(&self, name: &str) -> Value {
            json!(format!("{}, {}", self.prefix, name))
        }
    }

    fn run(processor: &dyn Processor, name: &str) -> Value {
        processor.process(name)
    }

    #[test]
    fn test_closure_processor() {
        let render = |name: &str| json!(format!("<div>{name}</div>"));
        assert_eq!(run(&render, "sidebar"), json!("<div>sidebar</div>"));
    }

    #[test]
    fn test_struct_processor() {
        let greeting = Greeting { prefix: "Hello" };
        assert_eq!(run(&greeting, "world"), json!("Hello, world"));
    }
}
