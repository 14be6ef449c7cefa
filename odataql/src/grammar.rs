use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "odataql.pest"]
pub struct ODataParser;
