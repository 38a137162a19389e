use llmbridge::prelude::*;

#[derive(Deserialize, InputSchema)]
struct AddInput {
    /// Left operand
    a: i64,
    /// Right operand
    b: i64,
}

#[derive(Deserialize, InputSchema)]
struct FibonacciInput {
    /// Position in the sequence
    n: u32,
}

#[derive(Deserialize, InputSchema)]
struct GreetInput {
    /// Who to greet
    name: String,
}

struct Toolbox;

#[service]
impl Toolbox {
    /// Adds two numbers.
    #[expose(name = "addNumbers")]
    fn add(&self, input: AddInput) -> String {
        (input.a + input.b).to_string()
    }

    /// Greets a person.
    #[expose]
    fn greet(&self, input: GreetInput) -> String {
        format!("Hello, {}!", input.name)
    }

    /// Calculates the Fibonacci number at the given position.
    #[expose]
    fn fibonacci(&self, input: FibonacciInput) -> Result<String, String> {
        if input.n > 93 {
            return Err(format!("F({}) does not fit in 64 bits", input.n));
        }
        let (mut a, mut b) = (0u64, 1u64);
        for _ in 0..input.n {
            // `b` runs one term ahead and may saturate on the final step.
            (a, b) = (b, a.saturating_add(b));
        }
        Ok(a.to_string())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("llmbridge Basic Example\n=======================");

    let router = Router::builder().service(Toolbox).build()?;

    let sum = router.handle_function("addNumbers", json!({ "a": 3, "b": 4 }))?;
    println!("addNumbers(3, 4) → {sum}");

    let greeting = router.handle_function("greet", json!({ "name": "World" }))?;
    println!("greet(\"World\") → {greeting}");

    let fib = router.handle_function("fibonacci", json!({ "n": 10 }))?;
    println!("fibonacci(10) → {fib}");

    // Errors come back as text for the model to read.
    let too_big = router.handle_function("fibonacci", json!({ "n": 200 }))?;
    println!("fibonacci(200) → {too_big}");

    let missing = router.handle_function("multiply", json!({ "a": 3, "b": 4 }))?;
    println!("multiply(3, 4) → {missing}");

    let invalid = router.handle_function("addNumbers", json!({ "a": "three" }))?;
    println!("addNumbers(\"three\") → {invalid}");

    println!("\nAvailable functions:");
    for decl in router.function_schemas() {
        println!("  - {}: {}", decl.function.name, decl.function.description);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fibonacci_covers_the_whole_u64_range() {
        let router = Router::builder().service(Toolbox).build().unwrap();

        let last = router.handle_function("fibonacci", json!({ "n": 93 })).unwrap();
        assert_eq!(last, "12200160415121876738");

        let ten = router.handle_function("fibonacci", json!({ "n": 10 })).unwrap();
        assert_eq!(ten, "55");

        let too_big = router.handle_function("fibonacci", json!({ "n": 94 })).unwrap();
        assert!(too_big.contains("does not fit in 64 bits"), "{too_big}");
    }
}
