use std::collections::HashMap;

const K1: f64 = 1.5;
const B: f64 = 0.75;

/// Okapi BM25 over a fixed corpus of tokenized documents.
#[derive(Debug, Clone)]
pub struct Bm25 {
    doc_freqs: Vec<HashMap<String, usize>>,
    doc_lens: Vec<usize>,
    idf: HashMap<String, f64>,
    avgdl: f64,
}

impl Bm25 {
    pub fn new(corpus: &[Vec<String>]) -> Self {
        let mut doc_freqs = Vec::with_capacity(corpus.len());
        let mut doc_lens = Vec::with_capacity(corpus.len());
        let mut doc_counts: HashMap<String, usize> = HashMap::new();

        for document in corpus {
            let mut freqs: HashMap<String, usize> = HashMap::new();
            for token in document {
                *freqs.entry(token.clone()).or_default() += 1;
            }
            for token in freqs.keys() {
                *doc_counts.entry(token.clone()).or_default() += 1;
            }
            doc_lens.push(document.len());
            doc_freqs.push(freqs);
        }

        let total_docs = corpus.len() as f64;
        let idf = doc_counts
            .into_iter()
            .map(|(token, count)| {
                let count = count as f64;
                let value = (1.0 + (total_docs - count + 0.5) / (count + 0.5)).ln();
                (token, value)
            })
            .collect();
        let total_len = doc_lens.iter().sum::<usize>() as f64;
        let avgdl = total_len / corpus.len().max(1) as f64;

        Self {
            doc_freqs,
            doc_lens,
            idf,
            avgdl,
        }
    }

    /// One score per corpus document, in corpus order.
    pub fn scores(&self, query: &[String]) -> Vec<f64> {
        let avgdl = self.avgdl.max(1e-9);
        self.doc_freqs
            .iter()
            .zip(&self.doc_lens)
            .map(|(freqs, doc_len)| {
                let length_norm = 1.0 - B + B * (*doc_len as f64) / avgdl;
                query
                    .iter()
                    .filter_map(|token| {
                        let freq = *freqs.get(token)? as f64;
                        let idf = self.idf.get(token).copied().unwrap_or(0.0);
                        Some(idf * (freq * (K1 + 1.0)) / (freq + K1 * length_norm))
                    })
                    .sum()
            })
            .collect()
    }
}
