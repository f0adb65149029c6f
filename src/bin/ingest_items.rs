use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    ume_review::apps::init_tracing();
    ume_review::apps::run_ingest_items(std::env::args().skip(1))
}
