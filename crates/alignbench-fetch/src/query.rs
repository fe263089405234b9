//! The two SPARQL query shapes the pipeline needs. Not a query engine:
//! identifiers are bound through an inline VALUES enumeration, nothing
//! else is parameterized.

/// CONSTRUCT the full `?s ?p ?o` neighborhood of a batch of identifiers,
/// keeping only literals that are untagged or match the configured
/// language. `identifiers` are canonical `<...>` tokens.
pub fn construct_query(identifiers: &[String], language: &str) -> String {
    let values = identifiers.join(" ");
    format!(
        "CONSTRUCT {{ ?s ?p ?o . }} WHERE {{ \
         VALUES ?s {{ {values} }} \
         ?s ?p ?o . \
         FILTER(!isLiteral(?o) || lang(?o) = \"\" || langMatches(lang(?o), \"{language}\")) \
         }}"
    )
}

/// SELECT labels and descriptions for a batch of identifiers in the
/// configured language.
pub fn label_query(identifiers: &[String], language: &str) -> String {
    let values = identifiers.join(" ");
    format!(
        "PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#> \
         PREFIX schema: <http://schema.org/> \
         SELECT ?s ?label ?desc WHERE {{ \
         VALUES ?s {{ {values} }} \
         OPTIONAL {{ ?s rdfs:label ?label FILTER(LANG(?label) = \"{language}\") }} \
         OPTIONAL {{ ?s schema:description ?desc FILTER(LANG(?desc) = \"{language}\") }} \
         }}"
    )
}
