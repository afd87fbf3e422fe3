//! # Report Templates
//!
//! @title Markdown Report Template
//! @author Ramprasad
//!
//! Handlebars template for the Markdown analysis report.

/// Markdown report. Rendered with escaping disabled.
pub const MARKDOWN_TEMPLATE: &str = r#"# Contract Analysis Report

| Field | Value |
|-------|-------|
| Address | `{{metadata.address}}` |
| Compiler | `{{metadata.compiler_version}}` |
| Files analyzed | {{metadata.files_analyzed}} |
| Files failed | {{metadata.files_failed}} |
| Generated | {{metadata.timestamp}} |
| Tool version | {{metadata.version}} |

## Libraries
{{#if metadata.libraries}}
{{#each metadata.libraries}}
- `{{this}}`
{{/each}}
{{else}}
_No library packages detected._
{{/if}}

## Files

| # | Source | Staged at | Status |
|---|--------|-----------|--------|
{{#each files}}
| {{index}} | `{{key}}` | `{{staged_path}}` | {{#if error}}failed: {{error}}{{else}}analyzed{{/if}} |
{{/each}}

## Slither Output

```
{{result.slitherResults}}
```

<details>
<summary>Combined source ({{metadata.source_lines}} lines)</summary>

```solidity
{{result.combinedSourceCode}}
```

</details>
"#;
