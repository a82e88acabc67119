mod normalizer;
mod stemmer;
mod stopwords;
mod vectorizer;

pub use normalizer::TextNormalizer;
pub use stemmer::PorterStemmer;
pub use stopwords::is_stopword;
pub use vectorizer::{SparseVector, TfidfVectorizer};
