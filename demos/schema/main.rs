use llmbridge::prelude::*;

#[derive(Debug, Deserialize, InputSchema)]
#[serde(rename_all = "snake_case")]
enum Category {
    Books,
    Music,
    HomeGarden,
}

#[derive(Debug, Deserialize, InputSchema)]
struct SearchFilters {
    /// Categories to restrict the search to
    categories: Vec<Category>,
    /// Minimum average rating, 0 to 5
    min_rating: Option<f32>,
}

fn default_max_results() -> u32 {
    10
}

#[derive(Debug, Deserialize, InputSchema)]
struct SearchRequest {
    /// Free-text query
    query: String,
    /// Upper bound on returned items
    #[serde(default = "default_max_results")]
    max_results: u32,
    filters: Option<SearchFilters>,
}

#[derive(Debug, Deserialize, InputSchema)]
#[serde(rename_all = "camelCase")]
struct CreatePerson {
    /// Full name
    full_name: String,
    age: u32,
    #[serde(default)]
    hobbies: Vec<String>,
}

struct Catalog;

#[service(name = "catalog")]
impl Catalog {
    /// Searches the product catalog.
    #[expose]
    fn search_products(&self, request: SearchRequest) -> String {
        format!("{} results for {:?}", request.max_results, request)
    }

    /// Registers a customer profile.
    #[expose]
    fn create_person(&self, person: CreatePerson) -> String {
        format!(
            "created {} ({}) with {} hobbies",
            person.full_name,
            person.age,
            person.hobbies.len()
        )
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let router = Router::builder().service(Catalog).build()?;

    println!("Function declarations:");
    println!("{}", serde_json::to_string_pretty(&router.function_schemas_json())?);

    println!("\nRequired arguments:");
    for decl in router.function_schemas() {
        println!("  {} → {:?}", decl.name(), decl.required());
    }

    let out = router.handle_function(
        "search_products",
        json!({
            "query": "gardening",
            "filters": { "categories": ["Home_Garden"], "min_rating": "4.5" }
        }),
    )?;
    println!("\nsearch_products → {out}");

    Ok(())
}
