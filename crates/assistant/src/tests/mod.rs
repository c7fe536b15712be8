mod retrieval;
